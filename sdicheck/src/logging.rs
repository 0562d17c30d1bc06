//! Logging initialization using `tracing` and `tracing-subscriber`.
//!
//! The configuration is static and controlled by:
//! - `RUST_LOG`: log level filtering (standard tracing-subscriber behavior)
//! - `SDICHECK_FORMAT`: output format (compact, full, bare, pretty, json)

use std::str::FromStr;

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;
use tracing_subscriber::{EnvFilter, Layer as _, Registry};

/// Environment variable selecting the [`LogFormat`].
pub const LOG_FORMAT_VAR: &str = "SDICHECK_FORMAT";

/// Log output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, single-line logs.
    Full,

    /// A variant of the full format optimized for short line lengths (default).
    Compact,

    /// Only the level and the message, for reading audit runs in a terminal.
    Bare,

    /// Multi-line logs for local debugging.
    Pretty,

    /// Newline-delimited JSON logs.
    Json,
}

impl Default for LogFormat {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Compact
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "full" => Ok(Self::Full),
            "compact" => Ok(Self::Compact),
            "bare" | "plain" => Ok(Self::Bare),
            "pretty" | "verbose" => Ok(Self::Pretty),
            "json" | "jsonl" => Ok(Self::Json),
            _ => Err(format!(
                "Invalid log format '{s}'. Valid options: full, compact, bare, pretty, json"
            )),
        }
    }
}

/// Initialize the global tracing subscriber for the given filter and format.
///
/// `log` records emitted by dependencies are bridged into `tracing`.
pub fn init_tracing(filter: &str, format: Option<String>) {
    tracing_log::LogTracer::builder()
        .with_interest_cache(tracing_log::InterestCacheConfig::default())
        .init()
        .expect("failed to initialise the global log -> tracing bridge");

    let env_filter = EnvFilter::from_str(filter).unwrap_or_else(|_| {
        eprintln!("Warning: Invalid filter string '{filter}' passed, falling back to debug");
        EnvFilter::new("debug")
    });

    let format = format
        .and_then(|s| {
            s.parse::<LogFormat>()
                .map_err(|e| {
                    eprintln!("Warning: {e}");
                    eprintln!("Falling back to the default format");
                })
                .ok()
        })
        .unwrap_or_default();
    match format {
        LogFormat::Full => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .with_span_events(FmtSpan::NONE)
                .with_filter(env_filter);
            Registry::default().with(fmt_layer).init();
        }
        LogFormat::Compact => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .compact()
                .with_span_events(FmtSpan::NONE)
                .with_filter(env_filter);
            Registry::default().with(fmt_layer).init();
        }
        LogFormat::Bare => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .without_time()
                .with_target(false)
                .with_span_events(FmtSpan::NONE)
                .with_filter(env_filter);
            Registry::default().with(fmt_layer).init();
        }
        LogFormat::Pretty => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .pretty()
                .with_filter(env_filter);
            Registry::default().with(fmt_layer).init();
        }
        LogFormat::Json => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_span_events(FmtSpan::NONE)
                .with_filter(env_filter);
            Registry::default().with(fmt_layer).init();
        }
    }
}

/// Mirrors the `sdicheck=` level of `RUST_LOG` onto `sdicheck_core=` when only the
/// former is given, so that engine events follow the level the user asked for.
#[must_use]
pub fn ensure_core_log_level_matches(env_filter: Option<String>) -> String {
    const BIN: &str = "sdicheck=";
    const CORE: &str = "sdicheck_core=";

    let Some(rust_log) = env_filter else {
        return format!("{BIN}info,{CORE}info");
    };
    if rust_log.contains(CORE) {
        return rust_log;
    }
    match rust_log.split(',').find_map(|s| s.strip_prefix(BIN)) {
        Some(level) => format!("{rust_log},{CORE}{level}"),
        None => rust_log,
    }
}
