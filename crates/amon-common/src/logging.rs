//! ---
//! amon_section: "01-core-functionality"
//! amon_subsection: "module"
//! amon_type: "source"
//! amon_scope: "code"
//! amon_description: "Tracing bootstrap for the monitor binary."
//! amon_version: "v0.1.0"
//! amon_owner: "tbd"
//! ---
use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::{info, Subscriber};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;

const LOG_ENV: &str = "AMON_LOG";
const FALLBACK_DIRECTIVE: &str = "info";

/// Writer guards for the process lifetime; dropping them loses buffered lines.
static GUARDS: OnceCell<[WorkerGuard; 2]> = OnceCell::new();

/// Console output format. The log file is always JSON.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    #[default]
    StructuredJson,
    Pretty,
}

/// Install the global subscriber: a console layer on stderr, keeping stdout
/// free for snapshot output, plus a daily rolling file under
/// `config.directory`. Filter directives come from `AMON_LOG`, then
/// `RUST_LOG`, then `info`.
///
/// A second call leaves the first subscriber in place.
pub fn init_tracing(service_name: &str, config: &LoggingConfig) -> Result<()> {
    std::fs::create_dir_all(&config.directory).with_context(|| {
        format!(
            "unable to create log directory {}",
            config.directory.display()
        )
    })?;
    let prefix = config.file_prefix.as_deref().unwrap_or(service_name);
    let (file_writer, file_guard) = tracing_appender::non_blocking(rolling::daily(
        &config.directory,
        format!("{prefix}.log"),
    ));
    let (console_writer, console_guard) = tracing_appender::non_blocking(std::io::stderr());
    let _ = GUARDS.set([file_guard, console_guard]);

    let directive = std::env::var(LOG_ENV)
        .ok()
        .or_else(|| std::env::var(EnvFilter::DEFAULT_ENV).ok());
    let filter = env_filter(directive.as_deref());

    let file_layer = fmt::layer()
        .json()
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_writer(file_writer)
        .boxed();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console_layer(config.format, console_writer))
        .with(file_layer)
        .try_init();

    info!(
        service = %service_name,
        log_dir = %config.directory.display(),
        format = ?config.format,
        "tracing initialised"
    );
    Ok(())
}

/// Filter for `directive`, falling back to `info` when it is missing or invalid.
fn env_filter(directive: Option<&str>) -> EnvFilter {
    match directive.map(EnvFilter::try_new) {
        Some(Ok(filter)) => filter,
        Some(Err(err)) => {
            eprintln!("ignoring invalid log directive ({err}); using {FALLBACK_DIRECTIVE}");
            EnvFilter::new(FALLBACK_DIRECTIVE)
        }
        None => EnvFilter::new(FALLBACK_DIRECTIVE),
    }
}

fn console_layer<S>(format: LogFormat, writer: NonBlocking) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    let layer = fmt::layer::<S>()
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_writer(writer);
    match format {
        LogFormat::StructuredJson => layer.json().with_target(false).boxed(),
        LogFormat::Pretty => layer.with_target(true).boxed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn invalid_directive_falls_back_to_info() {
        let info = Some(LevelFilter::INFO);
        assert_eq!(env_filter(None).max_level_hint(), info);
        assert_eq!(env_filter(Some("amon_core=loud")).max_level_hint(), info);
        assert_eq!(
            env_filter(Some("amon_core=debug")).max_level_hint(),
            Some(LevelFilter::DEBUG)
        );
    }

    #[test]
    fn log_format_uses_kebab_case() {
        #[derive(Deserialize)]
        struct Section {
            format: LogFormat,
        }
        let section: Section = toml::from_str("format = \"structured-json\"").expect("format parses");
        assert_eq!(section.format, LogFormat::StructuredJson);
    }
}
