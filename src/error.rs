//! Error handling for the sysstats crate.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::metrics::traits::SourceError;

/// A specialized `Result` type for sysstats operations.
pub type Result<T> = std::result::Result<T, StatsError>;

/// The main error type for sampling and serving host metrics.
#[derive(Debug, thiserror::Error)]
pub enum StatsError {
    /// A core metric (CPU, memory, disk, network, process list) could not be read.
    #[error("error getting {metric}: {source}")]
    MetricsUnavailable {
        metric: &'static str,
        #[source]
        source: SourceError,
    },

    /// A single process field could not be read. The process is dropped from the snapshot.
    #[error("process {pid}: {field} unavailable: {source}")]
    ProcessFieldUnavailable {
        pid: u32,
        field: &'static str,
        #[source]
        source: SourceError,
    },

    /// The client of a stream session went away.
    #[error("stream write failed: {0}")]
    TransportWriteFailure(String),

    /// The listener could not bind or failed while serving.
    #[error("server error: {context}: {source}")]
    ListenerFailure {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The blocking sampling task panicked or was cancelled.
    #[error("sampling task failed: {0}")]
    Sampler(#[from] tokio::task::JoinError),

    /// JSON serialization failed
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StatsError {
    /// Create a new metrics-unavailable error for the named metric.
    pub fn metrics_unavailable(metric: &'static str, source: SourceError) -> Self {
        Self::MetricsUnavailable { metric, source }
    }

    /// Create a new process-field error.
    pub fn process_field_unavailable(pid: u32, field: &'static str, source: SourceError) -> Self {
        Self::ProcessFieldUnavailable { pid, field, source }
    }

    /// Create a new transport write error.
    pub fn transport_write_failure(msg: impl Into<String>) -> Self {
        Self::TransportWriteFailure(msg.into())
    }

    /// Create a new listener error.
    pub fn listener_failure(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::ListenerFailure {
            context: context.into(),
            source,
        }
    }

    /// Create a new configuration error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

impl IntoResponse for StatsError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}
