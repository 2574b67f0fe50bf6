// src/metric/error.rs
//! Dispatcher error types.

use thiserror::Error;

use super::MetricKind;

#[derive(Debug, Error)]
pub enum MetricError {
    /// Payload does not fit the shape its kind requires.
    #[error("malformed {kind} metric{}: {reason}", at_key(.key))]
    Malformed {
        kind: MetricKind,
        key: Option<String>,
        reason: String,
    },

    /// Kind tag outside the closed set.
    #[error("unsupported metric kind '{0}'")]
    UnsupportedKind(String),

    #[error("metric JSON error: {0}")]
    Decode(#[from] serde_json::Error),
}

impl MetricError {
    pub(crate) fn malformed(kind: MetricKind, key: Option<&str>, reason: impl Into<String>) -> Self {
        MetricError::Malformed {
            kind,
            key: key.map(str::to_string),
            reason: reason.into(),
        }
    }

    /// Short machine-readable tag for logs and API bodies.
    pub fn code(&self) -> &'static str {
        match self {
            MetricError::Malformed { .. } => "malformed_metric",
            MetricError::UnsupportedKind(_) => "unsupported_metric_kind",
            MetricError::Decode(_) => "invalid_metric_json",
        }
    }
}

fn at_key(key: &Option<String>) -> String {
    key.as_deref()
        .map(|k| format!(" at '{k}'"))
        .unwrap_or_default()
}

pub type MetricResult<T> = Result<T, MetricError>;
