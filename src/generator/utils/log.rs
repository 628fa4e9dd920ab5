/// Global logging configuration
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

static ENABLE_REPORT: AtomicBool = AtomicBool::new(true);

/// Enable or disable the end-of-run report
pub fn set_report(enabled: bool) {
  ENABLE_REPORT.store(enabled, Ordering::Relaxed);
}

/// Check if the report is enabled, default is true
pub fn is_report_enabled() -> bool {
  ENABLE_REPORT.load(Ordering::Relaxed)
}

/// Install the `env_logger` backend.
///
/// `RUST_LOG` wins when set; otherwise `info`, or `warn` in quiet mode.
/// Calling it twice is harmless.
pub fn init_log(quiet: bool) {
  set_report(!quiet);
  let default = if quiet { "warn" } else { "info" };
  let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
    .format(|buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()))
    .try_init();
}
