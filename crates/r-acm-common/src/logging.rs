//! ---
//! acm_section: "01-core-functionality"
//! acm_subsection: "module"
//! acm_type: "source"
//! acm_scope: "code"
//! acm_description: "Shared configuration and tracing setup."
//! acm_version: "v0.0.0-prealpha"
//! acm_owner: "tbd"
//! ---
use anyhow::Result;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::daily;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;

const LOG_ENV: &str = "R_ACM_LOG";
/// Per-rule-type events from the model crate stay quiet unless asked for.
const DEFAULT_DIRECTIVE: &str = "info,r_acm_model=warn";

static FILE_GUARD: OnceCell<WorkerGuard> = OnceCell::new();
static STDOUT_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

/// Available log formats.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    #[default]
    StructuredJson,
    Pretty,
}

/// Where the active filter directive came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterSource {
    AcmEnv,
    RustLog,
    Config,
    Default,
}

/// Pick the filter directive: `R_ACM_LOG`, then `RUST_LOG`, then the configured
/// directive, then the built-in default.
pub fn resolve_filter(
    acm_env: Option<&str>,
    rust_log: Option<&str>,
    config: &LoggingConfig,
) -> (String, FilterSource) {
    if let Some(directive) = non_blank(acm_env) {
        return (directive.to_owned(), FilterSource::AcmEnv);
    }
    if let Some(directive) = non_blank(rust_log) {
        return (directive.to_owned(), FilterSource::RustLog);
    }
    if let Some(directive) = non_blank(config.filter.as_deref()) {
        return (directive.to_owned(), FilterSource::Config);
    }
    (DEFAULT_DIRECTIVE.to_owned(), FilterSource::Default)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn build_filter(directive: &str, source: FilterSource) -> EnvFilter {
    EnvFilter::try_new(directive).unwrap_or_else(|err| {
        eprintln!(
            "invalid {source:?} log directive `{directive}` ({err}); using {DEFAULT_DIRECTIVE}"
        );
        EnvFilter::new(DEFAULT_DIRECTIVE)
    })
}

/// Initialize the tracing subscriber for a service.
///
/// Events go to stdout in the configured format and, unless
/// `file_output = false`, to a daily rolling JSON file under `directory`.
pub fn init_tracing(service_name: &str, config: &LoggingConfig) -> Result<()> {
    let (directive, source) = resolve_filter(
        std::env::var(LOG_ENV).ok().as_deref(),
        std::env::var("RUST_LOG").ok().as_deref(),
        config,
    );

    let (stdout_writer, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());
    let _ = STDOUT_GUARD.set(stdout_guard);

    let stdout_layer = match config.format {
        LogFormat::StructuredJson => fmt::layer()
            .with_target(false)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .json()
            .with_writer(stdout_writer)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .with_target(true)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_writer(stdout_writer)
            .boxed(),
    };

    let file_layer = if config.file_output {
        std::fs::create_dir_all(&config.directory)?;
        let prefix = config.file_prefix.as_deref().unwrap_or("r-acm");
        let appender = daily(&config.directory, format!("{prefix}-{service_name}.log"));
        let (file_writer, file_guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(file_guard);
        Some(
            fmt::layer()
                .with_target(true)
                .with_timer(fmt::time::UtcTime::rfc_3339())
                .json()
                .with_writer(file_writer),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(build_filter(&directive, source))
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .ok();

    info!(
        service = %service_name,
        filter = %directive,
        filter_source = ?source,
        file_output = config.file_output,
        "tracing initialised"
    );
    Ok(())
}
