use error_stack::{Report, ResultExt};
use log::LevelFilter;

use crate::error::AdapterError;

/// Install a `fern` dispatcher writing timestamped records to stderr.
///
/// Hosts that already own a `log` backend should skip this; the adapter only
/// emits through the `log` facade.
///
/// # Errors
///
/// Returns [`AdapterError::Configuration`] when a global logger is already set.
pub fn init_logger(level: LevelFilter) -> Result<(), Report<AdapterError>> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}  {} {}",
                chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
                record.level(),
                message
            ));
        })
        .level(level)
        .chain(std::io::stderr())
        .apply()
        .change_context(AdapterError::Configuration {
            message: "Failed to initialize logger".to_string(),
        })
}
