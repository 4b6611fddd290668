use charuco_calib::backend::{OpenCvCharuco, OpenCvImageLoader, OpenCvSolver, PreviewWindow};
use charuco_calib::cli::{CalibrateArgs, CliError};
use charuco_calib::{BatchCalibration, CaptureFrontend, NoReview};
use clap::Parser;

fn main() {
    if let Err(err) = try_main() {
        log::error!("{err}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<(), CliError> {
    let args = CalibrateArgs::parse();
    args.verbosity.init_logging("charuco-calibrate")?;
    let config = args.resolve()?;
    let board = config.build_board()?;

    let mut detector = OpenCvCharuco::new(&board)?;
    let mut solver = OpenCvSolver::default();
    let batch = BatchCalibration::from_config(&board, &config);

    let report = if config.review {
        let mut window = PreviewWindow::new("charuco review", config.display_max_dim);
        let result = batch.run(
            &config.image_dir,
            &mut OpenCvImageLoader,
            &mut detector,
            &mut solver,
            &mut window,
        );
        window.close()?;
        result?
    } else {
        batch.run(
            &config.image_dir,
            &mut OpenCvImageLoader,
            &mut detector,
            &mut solver,
            &mut NoReview,
        )?
    };

    let (fx, fy) = report.calibration.focal_lengths();
    let (cx, cy) = report.calibration.principal_point();
    log::info!(
        "{} of {} images used ({} rejected, {} unreadable)",
        report.accepted,
        report.images,
        report.rejected,
        report.unreadable
    );
    log::info!("fx={fx:.2} fy={fy:.2} cx={cx:.2} cy={cy:.2}");
    log::info!("distortion: {:?}", report.calibration.distortion_coefficients);
    Ok(())
}
