//! Stderr logger for the capture and calibration tools.
//!
//! Lines look like `[charuco-calibrate   1.204s  WARN] message`. At debug
//! level and below the emitting module is appended so backend chatter can be
//! told apart from the calibration flow.

use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

use log::{Level, LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::fmt::format::FmtSpan;
#[cfg(feature = "tracing")]
use tracing_subscriber::util::SubscriberInitExt;
#[cfg(feature = "tracing")]
use tracing_subscriber::{fmt, EnvFilter};

struct ToolLogger {
    tool: &'static str,
    level: LevelFilter,
    started: Instant,
}

impl ToolLogger {
    fn format(&self, record: &Record) -> String {
        let elapsed = self.started.elapsed().as_secs_f64();
        let mut line = format!(
            "[{} {:7.3}s {:>5}] {}",
            self.tool,
            elapsed,
            record.level(),
            record.args()
        );
        if record.level() >= Level::Debug {
            line.push_str(&format!(" ({})", record.target()));
        }
        line
    }
}

impl Log for ToolLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = self.format(record);
        let _ = writeln!(std::io::stderr().lock(), "{line}");
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: OnceLock<ToolLogger> = OnceLock::new();

/// Install the logger for a named tool.
///
/// Only the first call installs anything; later calls keep the first level.
pub fn init_for_tool(tool: &'static str, level: LevelFilter) -> Result<(), log::SetLoggerError> {
    if LOGGER.get().is_none() {
        let logger = LOGGER.get_or_init(|| ToolLogger {
            tool,
            level,
            started: Instant::now(),
        });
        log::set_logger(logger)?;
        log::set_max_level(level);
    }
    Ok(())
}

/// Crates and binaries whose events pass the default filter at `level`.
#[cfg(feature = "tracing")]
const OWN_TARGETS: [&str; 4] = [
    "charuco_calib",
    "charuco_calib_core",
    "charuco_capture",
    "charuco_calibrate",
];

/// Filter used when `RUST_LOG` is unset: other crates at `warn`, ours at `level`.
#[cfg(feature = "tracing")]
fn default_directives(level: LevelFilter) -> String {
    let level = level.as_str().to_ascii_lowercase();
    let mut directives = String::from("warn");
    for target in OWN_TARGETS {
        directives.push_str(&format!(",{target}={level}"));
    }
    directives
}

/// Install a `tracing` subscriber instead.
///
/// `RUST_LOG` wins when set; otherwise our crates log at `level`.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool, level: LevelFilter) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));
    if json {
        let _ = fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .json()
            .flatten_event(true)
            .with_writer(std::io::stderr)
            .finish()
            .try_init();
    } else {
        let _ = fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .with_timer(fmt::time::Uptime::default())
            .with_writer(std::io::stderr)
            .finish()
            .try_init();
    }
}
