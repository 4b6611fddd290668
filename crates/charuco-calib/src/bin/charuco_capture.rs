use charuco_calib::backend::{
    ImageWriter, OpenCvCamera, OpenCvCharuco, OpenCvImageLoader, OpenCvSolver, PreviewWindow,
};
use charuco_calib::cli::{CaptureArgs, CliError};
use charuco_calib::{BatchCalibration, CalibError, CaptureSession, NoReview};
use clap::Parser;

fn main() {
    if let Err(err) = try_main() {
        log::error!("{err}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<(), CliError> {
    let args = CaptureArgs::parse();
    args.verbosity.init_logging("charuco-capture")?;
    let config = args.resolve()?;
    let board = config.build_board()?;

    std::fs::create_dir_all(&config.image_dir).map_err(CalibError::from)?;
    let mut detector = OpenCvCharuco::new(&board)?;
    let mut camera = OpenCvCamera::open(config.capture.camera_index)?;
    let mut window = PreviewWindow::new("charuco capture", config.display_max_dim)
        .with_keys(config.capture.keys.clone())
        .with_poll_interval(config.capture.poll_interval_ms);

    log::info!(
        "save a frame with {:?}, quit with {:?}; images go to {}",
        config.capture.keys.save,
        config.capture.keys.quit,
        config.image_dir.display()
    );
    let mut session = CaptureSession::new(
        &mut camera,
        &mut window,
        &mut ImageWriter,
        &mut detector,
        config.snapshot_namer(),
    );

    if args.no_calibrate {
        let report = session.run()?;
        log::info!(
            "{} of {} frames saved to {}",
            report.saved.len(),
            report.frames,
            config.image_dir.display()
        );
        return Ok(());
    }

    let (capture, report) = session.run_and_calibrate(
        &BatchCalibration::from_config(&board, &config),
        &mut OpenCvImageLoader,
        &mut OpenCvSolver::default(),
        &mut NoReview,
    )?;
    let (fx, fy) = report.calibration.focal_lengths();
    let (cx, cy) = report.calibration.principal_point();
    log::info!(
        "{} frames saved; {} of {} images used ({} rejected, {} unreadable)",
        capture.saved.len(),
        report.accepted,
        report.images,
        report.rejected,
        report.unreadable
    );
    log::info!("fx={fx:.2} fy={fy:.2} cx={cx:.2} cy={cy:.2}");
    log::info!("distortion: {:?}", report.calibration.distortion_coefficients);
    Ok(())
}
