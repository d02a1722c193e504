use std::sync::Arc;

use configs::RuntimeMode;
use service::{errors::ServiceError, posts::PostSyncService};

use crate::errors::ApiError;

#[derive(Clone)]
pub struct ServerState {
    pub posts: Arc<PostSyncService>,
    pub mode: RuntimeMode,
}

impl ServerState {
    pub fn new(posts: Arc<PostSyncService>, mode: RuntimeMode) -> Self {
        Self { posts, mode }
    }

    /// Turn a service failure into an error envelope, with debug detail in development.
    pub fn reject(&self, e: ServiceError) -> ApiError {
        ApiError::from_service(e, self.mode)
    }
}
