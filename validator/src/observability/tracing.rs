//! Tracing setup.

use anyhow::{Context, Error};
use std::{
    io,
    path::{Path, PathBuf},
};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{
    fmt::{
        format::{FmtSpan, Format, Json, JsonFields},
        Layer,
    },
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

type JsonLayer<S> = Layer<S, JsonFields, Format<Json>, NonBlocking>;

/// Helper to set up tracing.
///
/// Keep the returned value alive for as long as logs should flow; dropping
/// it flushes and closes the JSON appender.
#[must_use]
pub struct TracingConsumer {
    _json_appender_guard: Option<WorkerGuard>,
}

impl Default for TracingConsumer {
    fn default() -> Self {
        let stdout_layer = tracing_subscriber::fmt::layer().with_writer(io::stdout);
        let registry = tracing_subscriber::registry().with(EnvFilter::from_default_env()).with(stdout_layer);
        registry.init();
        Self { _json_appender_guard: None }
    }
}

impl TracingConsumer {
    /// Set up tracing with a JSON log file next to the stdout layer.
    pub fn new(json_path: PathBuf) -> Result<Self, Error> {
        let (json_layer, json_guard) = Self::setup_json_layer(json_path)?;
        let stdout_layer = tracing_subscriber::fmt::layer().with_writer(io::stdout);
        let registry =
            tracing_subscriber::registry().with(EnvFilter::from_default_env()).with(json_layer).with(stdout_layer);
        registry.init();
        Ok(Self { _json_appender_guard: Some(json_guard) })
    }

    fn setup_json_layer<S>(json_path: PathBuf) -> Result<(JsonLayer<S>, WorkerGuard), Error> {
        let json_log = Path::new(&json_path);
        let appender = tracing_appender::rolling::never(
            json_log.parent().with_context(|| format!("failed to start log on file {json_path:#?}"))?,
            json_log.file_name().with_context(|| format!("failed to start log on file {json_path:#?}"))?,
        );

        let (non_blocking_appender, guard) = tracing_appender::non_blocking(appender);
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_span_events(FmtSpan::CLOSE)
            .with_writer(non_blocking_appender);
        Ok((json_layer, guard))
    }
}
