//! Structured logging setup.

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human readable, one line per event
    #[default]
    Text,
    /// One JSON object per event with file, line and thread
    Json,
}

#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// `EnvFilter` directives, e.g. `info,worker=debug`
    pub filter: String,
    pub format: LogFormat,
    /// Log span open and close
    pub span_events: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            filter: "info,tower_http=debug".to_string(),
            format: LogFormat::Text,
            span_events: false,
        }
    }
}

impl TracingConfig {
    /// Read `RUST_LOG`, `LOG_JSON` and `LOG_SPANS`.
    pub fn from_env() -> Self {
        let flag = |name: &str| {
            std::env::var(name)
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false)
        };

        let mut config = Self::default();
        if let Ok(filter) = std::env::var("RUST_LOG") {
            config.filter = filter;
        }
        if flag("LOG_JSON") {
            config.format = LogFormat::Json;
        }
        config.span_events = flag("LOG_SPANS");
        config
    }
}

/// Install the global subscriber.
///
/// Returns false if one was already installed; every test context in a
/// test binary calls this.
pub fn init_tracing(config: TracingConfig) -> bool {
    let filter = EnvFilter::try_new(&config.filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let spans = if config.span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let output = match config.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_span_events(spans)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Text => fmt::layer().with_span_events(spans).boxed(),
    };

    let installed = tracing_subscriber::registry()
        .with(output.with_filter(filter))
        .try_init()
        .is_ok();

    if installed {
        tracing::info!(filter = %config.filter, format = ?config.format, "Tracing initialized");
    }
    installed
}

pub fn init_tracing_from_env() -> bool {
    init_tracing(TracingConfig::from_env())
}
