#![forbid(unsafe_code)]

use tracing_subscriber::EnvFilter;

use crate::config::LogLevel;

/// Directive string for the subscriber: `RUST_LOG` when set, otherwise the
/// configured level (or `debug` when verbose). Our own crate is the only
/// target raised; dependencies stay at `warn`.
fn directives(level: LogLevel, verbose: bool, rust_log: Option<&str>) -> String {
    if let Some(raw) = rust_log.map(str::trim).filter(|s| !s.is_empty()) {
        return raw.to_owned();
    }
    let ours = if verbose { "debug" } else { level.as_str() };
    format!("warn,valvetrack={ours}")
}

fn build_env_filter(level: LogLevel, verbose: bool) -> anyhow::Result<EnvFilter> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = directives(level, verbose, rust_log.as_deref());
    EnvFilter::try_new(&filter)
        .map_err(|e| anyhow::anyhow!("invalid tracing filter '{filter}': {e}"))
}

/// Installs the global subscriber. Logs go to stderr so stdout stays clean
/// for `--json` and `--csv`. Calling it twice is harmless.
pub fn init(level: LogLevel, verbose: bool) -> anyhow::Result<()> {
    let filter = build_env_filter(level, verbose)?;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rust_log_wins() {
        assert_eq!(directives(LogLevel::Error, true, Some("trace")), "trace");
    }

    #[test]
    fn verbose_raises_own_target_only() {
        assert_eq!(directives(LogLevel::Warn, false, None), "warn,valvetrack=warn");
        assert_eq!(directives(LogLevel::Warn, true, Some("  ")), "warn,valvetrack=debug");
        assert_eq!(directives(LogLevel::Info, false, None), "warn,valvetrack=info");
    }

    #[test]
    fn directives_parse() {
        assert!(EnvFilter::try_new(directives(LogLevel::Trace, false, None)).is_ok());
    }
}
