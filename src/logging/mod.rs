//! Structured logging via `tracing`.
//!
//! The library only emits events. Hosts install their own subscriber, or
//! call [`init_tracing`] with the `logging` section of a
//! [`GenerationConfig`](crate::config::GenerationConfig).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Once;
use std::time::Instant;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// `-v` count from the CLI: none is warn, then info, debug, trace
    pub fn from_verbosity(count: u8) -> Self {
        match count {
            0 => LogLevel::Warn,
            1 => LogLevel::Info,
            2 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        f.write_str(name)
    }
}

/// Subscriber settings carried in the generation config.
///
/// `modules` maps a module path under this crate (`layout`, `enrichment`)
/// to its own level. Per-zone fragment events are `debug`, so the defaults
/// keep the layout and planner quiet unless asked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TracingConfig {
    pub level: LogLevel,
    pub modules: BTreeMap<String, LogLevel>,
    pub targets: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            modules: BTreeMap::from([
                ("random".to_string(), LogLevel::Warn),
                ("planner".to_string(), LogLevel::Info),
            ]),
            targets: false,
        }
    }
}

impl TracingConfig {
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// `EnvFilter` directives, e.g. `info,rundown_core::random=warn`
    pub fn directives(&self) -> String {
        let mut directives = vec![self.level.to_string()];
        directives.extend(
            self.modules
                .iter()
                .map(|(module, level)| format!("{}::{}={}", env!("CARGO_CRATE_NAME"), module, level)),
        );
        directives.join(",")
    }
}

static TRACING_INIT: Once = Once::new();

/// Install a compact stderr subscriber once per process. `RUST_LOG` wins
/// over the config; an already-installed global subscriber is kept.
pub fn init_tracing(config: &TracingConfig) {
    TRACING_INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.directives()));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(config.targets)
            .compact()
            .try_init();
    });
}

/// Span around one level or rundown build. Logs the elapsed time when
/// dropped.
pub struct TimingSpan {
    what: &'static str,
    started: Instant,
    _span: tracing::span::EnteredSpan,
}

impl TimingSpan {
    pub fn level(label: &str) -> Self {
        Self::enter("level", tracing::info_span!("level", level = label))
    }

    pub fn rundown(seed: &str) -> Self {
        Self::enter("rundown", tracing::info_span!("rundown", seed))
    }

    fn enter(what: &'static str, span: tracing::Span) -> Self {
        Self {
            what,
            started: Instant::now(),
            _span: span.entered(),
        }
    }
}

impl Drop for TimingSpan {
    fn drop(&mut self) {
        debug!(elapsed_ms = self.started.elapsed().as_millis() as u64, "{} done", self.what);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_mapping() {
        assert_eq!(LogLevel::from_verbosity(0), LogLevel::Warn);
        assert_eq!(LogLevel::from_verbosity(2), LogLevel::Debug);
        assert_eq!(LogLevel::from_verbosity(9), LogLevel::Trace);
    }

    #[test]
    fn test_directives_prefix_crate_modules() {
        let directives = TracingConfig::default().with_level(LogLevel::Debug).directives();
        assert_eq!(directives, "debug,rundown_core::planner=info,rundown_core::random=warn");
    }

    #[test]
    fn test_config_section_from_ron() {
        let config: TracingConfig = ron::from_str("(level: warn, modules: { \"layout\": trace })").unwrap();
        assert_eq!(config.level, LogLevel::Warn);
        assert_eq!(config.modules.get("layout"), Some(&LogLevel::Trace));
        assert!(!config.targets);
    }

    #[test]
    fn test_init_tracing_twice() {
        init_tracing(&TracingConfig::default());
        init_tracing(&TracingConfig::default().with_level(LogLevel::Trace));
        let _span = TimingSpan::rundown("test");
    }
}
