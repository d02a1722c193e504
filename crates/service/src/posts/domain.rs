use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::errors::ServiceError;

/// Stored post record.
pub type Post = models::post::Model;

/// Create/update request body. Fields stay optional until validated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostInput {
    #[serde(default, deserialize_with = "lenient_user_id")]
    pub user_id: Option<i32>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
}

// Form posts send `"userId": "1"`; accept numeric strings as well as numbers.
fn lenient_user_id<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i32>, D::Error> {
    let raw = Option::<Value>::deserialize(d)?;
    Ok(match raw {
        Some(Value::Number(n)) => n.as_i64().and_then(|n| i32::try_from(n).ok()),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

impl PostInput {
    pub fn new(user_id: i32, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self { user_id: Some(user_id), title: Some(title.into()), body: Some(body.into()) }
    }

    pub fn validate(&self) -> Result<PostDraft, ServiceError> {
        let (user_id, title, body) =
            models::post::validate_required(self.user_id, self.title.as_deref(), self.body.as_deref())?;
        Ok(PostDraft { user_id, title, body })
    }
}

/// Validated field values shared by create and update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostDraft {
    pub user_id: i32,
    pub title: String,
    pub body: String,
}

impl PostDraft {
    /// Wire form for the remote API.
    pub fn to_remote(&self, id: Option<i32>) -> common::types::Post {
        common::types::Post {
            id,
            user_id: Some(self.user_id),
            title: self.title.clone(),
            body: self.body.clone(),
        }
    }
}

/// A row about to be inserted, id already decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub id: i32,
    pub user_id: i32,
    pub title: String,
    pub body: String,
}

impl NewPost {
    pub fn from_draft(id: i32, draft: PostDraft) -> Self {
        Self { id, user_id: draft.user_id, title: draft.title, body: draft.body }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostOrder {
    /// Whatever order the store returns rows in.
    Insertion,
    IdAsc,
}

/// Outcome of the best-effort remote write made during an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteSync {
    Synced,
    Failed(String),
}

impl RemoteSync {
    pub fn is_synced(&self) -> bool {
        matches!(self, RemoteSync::Synced)
    }
}

#[derive(Debug, Clone)]
pub struct UpdatedPost {
    pub post: Post,
    pub remote: RemoteSync,
}
