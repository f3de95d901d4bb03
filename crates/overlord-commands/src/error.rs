//! Error types for the dispatch engine and its collaborators.

use crate::template::TemplateError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Failure reported by an external collaborator (HTTP service, store, model).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The service could not be reached or answered with a server-side error.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// The service understood the request and refused it.
    #[error("request rejected: {0}")]
    Rejected(String),

    /// The service did not answer in time.
    #[error("service timed out")]
    Timeout,

    /// Local persistence failed.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl ServiceError {
    /// Whether retrying the same call could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout)
    }
}

impl From<std::io::Error> for ServiceError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

/// Errors from catalog mutations.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// The requested name or alias is already taken.
    #[error("!{0} already exists")]
    DuplicateName(String),

    /// No command with that name exists.
    #[error("!{0} not found")]
    NotFound(String),

    /// Built-in commands and their aliases cannot be replaced or removed.
    #[error("!{0} is a built-in command and cannot be changed")]
    ProtectedCommand(String),

    /// The name contains characters that can never be typed as a command.
    #[error("'{0}' is not a valid command name")]
    InvalidName(String),

    /// The response template does not render.
    #[error("invalid response template: {0}")]
    InvalidTemplate(#[from] TemplateError),

    /// The command store refused the write; the catalog was left unchanged.
    #[error("command store error: {0}")]
    Store(#[from] ServiceError),
}

/// Why a handler produced no reply.
#[derive(Error, Debug)]
pub enum ExecutionError {
    /// A custom command's template could not be rendered.
    #[error("malformed template: {0}")]
    MalformedTemplate(#[from] TemplateError),

    /// The handler exceeded its time budget.
    #[error("handler timed out")]
    Timeout,

    /// An external dependency failed and retrying did not help.
    #[error("upstream failure: {0}")]
    UpstreamFailure(ServiceError),
}

impl ExecutionError {
    /// Metrics classification of this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::MalformedTemplate(_) => FailureKind::MalformedTemplate,
            Self::Timeout => FailureKind::Timeout,
            Self::UpstreamFailure(_) => FailureKind::UpstreamFailure,
        }
    }
}

/// Execution failure classes recorded to metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// See [`ExecutionError::MalformedTemplate`].
    MalformedTemplate,
    /// See [`ExecutionError::Timeout`].
    Timeout,
    /// See [`ExecutionError::UpstreamFailure`].
    UpstreamFailure,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::MalformedTemplate => "malformed_template",
            Self::Timeout => "timeout",
            Self::UpstreamFailure => "upstream_failure",
        };
        f.write_str(label)
    }
}
