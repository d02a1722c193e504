use thiserror::Error;

pub mod types;
pub mod utils;
pub mod env;
pub mod metrics;
pub mod posts;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("network error: {0}")]
    Network(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },
}

impl CoreError {
    /// HTTP status reported by the remote side, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            CoreError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
