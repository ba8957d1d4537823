use std::sync::Once;

/// Default filter when neither `RUST_LOG` nor an explicit filter is given.
///
/// The wgpu internals log per-resource churn at info level; keep them at
/// warn so frame-loop output stays readable.
const DEFAULT_FILTER: &str = "info,wgpu_core=warn,wgpu_hal=warn";

/// Logger configuration.
///
/// `env_filter` follows the `env_logger` filter syntax (e.g. "info",
/// "ember_engine=debug,wgpu=warn") and overrides `RUST_LOG` when set.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            write_style: env_logger::WriteStyle::Auto,
        }
    }
}

static INIT: Once = Once::new();

/// Initializes the global logger once, early in `main`.
///
/// Idempotent; subsequent calls are ignored.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let env = env_logger::Env::default().default_filter_or(DEFAULT_FILTER);
        let mut builder = env_logger::Builder::from_env(env);

        if let Some(filter) = &config.env_filter {
            builder.parse_filters(filter);
        }

        builder.write_style(config.write_style);
        builder.format_timestamp_millis();
        builder.init();

        log::debug!("logging initialized");
    });
}
