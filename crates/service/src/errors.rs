use thiserror::Error;

use models::errors::ModelError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{message}")]
    Upstream {
        status: Option<u16>,
        message: String,
        cause: Option<String>,
    },
    #[error("{0}")]
    Storage(String),
}

impl ServiceError {
    pub fn not_found(message: impl Into<String>) -> Self { Self::NotFound(message.into()) }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream { status: None, message: message.into(), cause: None }
    }

    /// Replace the message of an upstream error, keeping the original one as its cause.
    /// Other variants pass through untouched.
    pub fn upstream_context(self, message: impl Into<String>) -> Self {
        match self {
            Self::Upstream { status, message: inner, cause } => Self::Upstream {
                status,
                message: message.into(),
                cause: cause.or(Some(inner)),
            },
            other => other,
        }
    }

    /// HTTP status this error maps to.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::NotFound(_) => 404,
            Self::Upstream { .. } => 502,
            Self::Storage(_) => 500,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "ValidationError",
            Self::NotFound(_) => "NotFound",
            Self::Upstream { .. } => "UpstreamError",
            Self::Storage(_) => "StorageError",
        }
    }

    /// Extra detail lines for error envelopes.
    pub fn details(&self) -> Vec<String> {
        match self {
            Self::Upstream { status, cause, .. } => status
                .map(|s| format!("remote status {s}"))
                .into_iter()
                .chain(cause.clone())
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl From<ModelError> for ServiceError {
    fn from(e: ModelError) -> Self {
        match e {
            ModelError::Validation(msg) => Self::Validation(msg),
            ModelError::Db(msg) => Self::Storage(msg),
        }
    }
}

impl From<sea_orm::DbErr> for ServiceError {
    fn from(e: sea_orm::DbErr) -> Self { Self::Storage(e.to_string()) }
}
