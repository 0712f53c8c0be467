//! Opt-in diagnostics on stderr. stdout stays reserved for benchmark output.

use std::sync::Once;
use tracing::warn;
use tracing_subscriber::EnvFilter;

pub const TRACE_ENV: &str = "FITSBENCH_TRACE";
const DEFAULT_TRACE_FILTER: &str = "fitsbench_core=debug,fitsbench_fits=debug,fitsbench_cli=info";

static TRACE_INIT: Once = Once::new();

/// What a `FITSBENCH_TRACE` value asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceSetting {
    Off,
    /// Switched on without a filter: use `RUST_LOG` or the crate defaults.
    On,
    Filter(String),
}

impl TraceSetting {
    pub fn parse(raw: &str) -> Self {
        let value = raw.trim();
        match value.to_ascii_lowercase().as_str() {
            "" | "0" | "false" | "off" => TraceSetting::Off,
            "1" | "true" | "on" => TraceSetting::On,
            _ => TraceSetting::Filter(value.to_string()),
        }
    }
}

pub fn maybe_init_tracing() {
    let setting = std::env::var(TRACE_ENV)
        .map(|raw| TraceSetting::parse(&raw))
        .unwrap_or(TraceSetting::Off);
    let requested = match setting {
        TraceSetting::Off => return,
        TraceSetting::On => std::env::var("RUST_LOG").ok(),
        TraceSetting::Filter(expr) => Some(expr),
    };

    TRACE_INIT.call_once(|| {
        let (filter, rejected) = match requested.map(|expr| EnvFilter::try_new(&expr).map_err(|e| (expr, e))) {
            Some(Ok(filter)) => (filter, None),
            Some(Err(bad)) => (EnvFilter::new(DEFAULT_TRACE_FILTER), Some(bad)),
            None => (EnvFilter::new(DEFAULT_TRACE_FILTER), None),
        };
        let installed = tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .try_init()
            .is_ok();
        // An already installed subscriber wins.
        if installed {
            if let Some((expr, e)) = rejected {
                warn!("ignoring trace filter '{}': {}", expr, e);
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::TraceSetting;

    #[test]
    fn parses_switches_and_filters() {
        assert_eq!(TraceSetting::parse(""), TraceSetting::Off);
        assert_eq!(TraceSetting::parse(" OFF "), TraceSetting::Off);
        assert_eq!(TraceSetting::parse("0"), TraceSetting::Off);
        assert_eq!(TraceSetting::parse("True"), TraceSetting::On);
        assert_eq!(
            TraceSetting::parse(" fitsbench_core=trace "),
            TraceSetting::Filter("fitsbench_core=trace".to_string())
        );
    }
}
