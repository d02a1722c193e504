//! HTTP client for the remote posts API (JSONPlaceholder by default).
//!
//! The client only speaks HTTP: list/create/update surface non-2xx answers as
//! [`CoreError::Status`], while `delete` hands the status back to the caller.

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use tracing::debug;

use crate::{types::Post, CoreError};

pub const DEFAULT_BASE_URL: &str = "https://jsonplaceholder.typicode.com/posts";

#[derive(Debug, Clone)]
pub struct PostsApi {
    client: Client,
    base_url: String,
}

impl PostsApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, CoreError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::Network(e.to_string()))?;
        Ok(Self { client, base_url: base_url.trim_end_matches('/').to_string() })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn item_url(&self, id: i32) -> String {
        format!("{}/{id}", self.base_url)
    }

    /// Fetch the whole collection as raw JSON. Shape checks are left to the caller.
    pub async fn list(&self) -> Result<Value, CoreError> {
        let resp = self
            .client
            .get(&self.base_url)
            .send()
            .await
            .map_err(|e| CoreError::Network(e.to_string()))?;
        let resp = check_status(resp)?;
        debug!(url = %self.base_url, "remote list answered");
        resp.json::<Value>()
            .await
            .map_err(|e| CoreError::Parse(e.to_string()))
    }

    /// Create a post remotely. `Ok(None)` means the remote answered without a payload.
    pub async fn create(&self, post: &Post) -> Result<Option<Post>, CoreError> {
        let resp = self
            .client
            .post(&self.base_url)
            .json(post)
            .send()
            .await
            .map_err(|e| CoreError::Network(e.to_string()))?;
        decode_optional(check_status(resp)?).await
    }

    pub async fn update(&self, id: i32, post: &Post) -> Result<Option<Post>, CoreError> {
        let resp = self
            .client
            .put(self.item_url(id))
            .json(post)
            .send()
            .await
            .map_err(|e| CoreError::Network(e.to_string()))?;
        decode_optional(check_status(resp)?).await
    }

    /// Delete a post remotely and return the raw status.
    pub async fn delete(&self, id: i32) -> Result<StatusCode, CoreError> {
        let resp = self
            .client
            .delete(self.item_url(id))
            .send()
            .await
            .map_err(|e| CoreError::Network(e.to_string()))?;
        Ok(resp.status())
    }
}

fn check_status(resp: Response) -> Result<Response, CoreError> {
    let status = resp.status();
    if status.is_success() {
        Ok(resp)
    } else {
        Err(CoreError::Status { status: status.as_u16(), url: resp.url().to_string() })
    }
}

async fn decode_optional(resp: Response) -> Result<Option<Post>, CoreError> {
    let bytes = resp
        .bytes()
        .await
        .map_err(|e| CoreError::Network(e.to_string()))?;
    if bytes.is_empty() {
        return Ok(None);
    }
    let value: Value = serde_json::from_slice(&bytes).map_err(|e| CoreError::Parse(e.to_string()))?;
    match &value {
        Value::Null => Ok(None),
        Value::Object(map) if map.is_empty() => Ok(None),
        _ => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| CoreError::Parse(e.to_string())),
    }
}
