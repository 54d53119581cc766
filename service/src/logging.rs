use crate::config::Config;
use log::{LevelFilter, SetLoggerError};
use simplelog::{self, ConfigBuilder};

/// Modules to filter out from logging when not in Trace mode.
/// Runtime and transport crates pulled in by token providers and cache backends.
const FILTERED_MODULES: &[&str] = &["tokio", "mio", "hyper", "reqwest", "rustls"];

pub struct Logger {}

impl Logger {
    /// Installs the global console logger at the configured level.
    ///
    /// `wxopen_auth` emits through `tracing`, which forwards to this logger
    /// when no tracing subscriber is installed.
    ///
    /// # Errors
    ///
    /// Fails if a global logger has already been set.
    pub fn init_logger(config: &Config) -> Result<(), SetLoggerError> {
        let apply_filters = Self::should_filter_dependencies(config.log_level_filter);

        simplelog::TermLogger::init(
            config.log_level_filter,
            Self::build_log_config(apply_filters),
            simplelog::TerminalMode::Mixed,
            simplelog::ColorChoice::Auto,
        )
    }

    /// Dependency logs are only shown at Trace.
    fn should_filter_dependencies(level: LevelFilter) -> bool {
        level != LevelFilter::Trace
    }

    fn build_log_config(apply_filters: bool) -> simplelog::Config {
        let mut builder = ConfigBuilder::new();
        builder.set_time_format_rfc3339();

        if apply_filters {
            for module in FILTERED_MODULES {
                builder.add_filter_ignore_str(module);
            }
        }

        builder.build()
    }
}
