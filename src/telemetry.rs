#[cfg(feature = "telemetry")]
use std::sync::OnceLock;

#[cfg(feature = "telemetry")]
use tracing_subscriber::{EnvFilter, fmt};

/// Initialize tracing subscriber once per process. Honors `RUST_LOG`, defaults
/// to `bugscan=info`.
pub fn init_tracing() {
    #[cfg(feature = "telemetry")]
    static INIT: OnceLock<()> = OnceLock::new();

    #[cfg(feature = "telemetry")]
    {
        INIT.get_or_init(|| {
            let filter = EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("bugscan=info"));
            let _ = fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init();
        });
    }
}

/// Emit a `tracing` event at the given level (`debug`, `info`, `warn`, ...)
/// when telemetry is enabled; expands to nothing otherwise.
#[macro_export]
macro_rules! log_event {
    ($level:ident, $($arg:tt)+) => {{
        #[cfg(feature = "telemetry")]
        {
            ::tracing::$level!($($arg)+);
        }
    }};
}

/// Instrument an inline block with a span if telemetry is enabled.
#[macro_export]
macro_rules! instrument_block {
    ($name:expr, $block:block) => {{
        #[cfg(feature = "telemetry")]
        {
            let span = ::tracing::info_span!("bugscan", phase = $name);
            let _guard = span.enter();
            (|| $block)()
        }
        #[cfg(not(feature = "telemetry"))]
        {
            (|| $block)()
        }
    }};
}
