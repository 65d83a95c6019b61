use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::Registry;

/// Configuration of the diagnostics subscriber.
///
/// Diagnostics are the crate's own messages about the sinks (connection
/// established, write failed), not the log entries the sinks persist.
///
/// **Fields**
/// - `default_directive`: filter used when `RUST_LOG` is not set.
/// - `ansi`: colorize stderr output.
/// - `with_target`: include the emitting module in every line.
#[derive(Clone, Debug)]
pub struct DiagnosticsConfig {
    pub default_directive: String,
    pub ansi: bool,
    pub with_target: bool,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            default_directive: "info".to_string(),
            ansi: true,
            with_target: true,
        }
    }
}

impl DiagnosticsConfig {
    /// `RUST_LOG` if present and valid, otherwise `default_directive`.
    pub fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.default_directive))
    }
}

/// Install a global subscriber that prints diagnostics to stderr.
///
/// **Returns**
/// - `Err(..)` if another global subscriber has already been installed;
///   the existing one stays in place.
pub fn init_diagnostics_with_config(config: DiagnosticsConfig) -> Result<(), TryInitError> {
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(config.ansi)
        .with_target(config.with_target);
    Registry::default()
        .with(config.filter())
        .with(fmt_layer)
        .try_init()
}

/// Install diagnostics with [`DiagnosticsConfig::default`].
pub fn init_diagnostics() -> Result<(), TryInitError> {
    init_diagnostics_with_config(DiagnosticsConfig::default())
}
