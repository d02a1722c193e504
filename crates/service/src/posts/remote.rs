use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use common::{metrics, posts::PostsApi, CoreError};

use super::domain::PostDraft;
use crate::errors::ServiceError;

pub use common::types::Post as RemotePost;

/// The remote posts API as seen by the sync policy.
/// Every failure is a [`ServiceError::Upstream`]; callers decide whether to propagate it.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Raw list payload; shape checks belong to the caller.
    async fn list(&self) -> Result<Value, ServiceError>;
    /// `Ok(None)` when the remote answered without a payload.
    async fn create(&self, draft: &PostDraft) -> Result<Option<RemotePost>, ServiceError>;
    async fn update(&self, id: i32, draft: &PostDraft) -> Result<(), ServiceError>;
    /// Returns the HTTP status of the delete call, success or not.
    async fn delete(&self, id: i32) -> Result<u16, ServiceError>;
}

fn upstream(e: CoreError) -> ServiceError {
    ServiceError::Upstream { status: e.status(), message: e.to_string(), cause: None }
}

fn observe<T>(op: &str, res: Result<T, CoreError>) -> Result<T, ServiceError> {
    metrics::record_remote_call(op, res.is_ok());
    if let Err(e) = &res {
        debug!(op, error = %e, "remote call failed");
    }
    res.map_err(upstream)
}

#[async_trait]
impl RemoteSource for PostsApi {
    async fn list(&self) -> Result<Value, ServiceError> {
        observe("list", PostsApi::list(self).await)
    }

    async fn create(&self, draft: &PostDraft) -> Result<Option<RemotePost>, ServiceError> {
        observe("create", PostsApi::create(self, &draft.to_remote(None)).await)
    }

    async fn update(&self, id: i32, draft: &PostDraft) -> Result<(), ServiceError> {
        observe("update", PostsApi::update(self, id, &draft.to_remote(Some(id))).await).map(|_| ())
    }

    async fn delete(&self, id: i32) -> Result<u16, ServiceError> {
        let res = PostsApi::delete(self, id).await;
        let ok = res.as_ref().is_ok_and(|s| s.is_success());
        metrics::record_remote_call("delete", ok);
        res.map(|s| s.as_u16()).map_err(upstream)
    }
}

/// Scriptable remote for tests: counts calls per operation.
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use serde_json::json;

    struct State {
        list_payload: Value,
        fail_list: bool,
        create_id: Option<i32>,
        fail_create: bool,
        fail_update: bool,
        delete_status: u16,
        fail_delete: bool,
        calls: HashMap<&'static str, usize>,
    }

    pub struct MockRemoteSource {
        state: Mutex<State>,
    }

    impl Default for MockRemoteSource {
        fn default() -> Self {
            Self {
                state: Mutex::new(State {
                    list_payload: json!([]),
                    fail_list: false,
                    create_id: Some(101),
                    fail_create: false,
                    fail_update: false,
                    delete_status: 200,
                    fail_delete: false,
                    calls: HashMap::new(),
                }),
            }
        }
    }

    impl MockRemoteSource {
        /// Remote with `n` JSONPlaceholder-like posts, ids `1..=n`.
        pub fn seeded(n: i32) -> Self {
            let posts: Vec<Value> = (1..=n)
                .map(|id| json!({"userId": (id - 1) / 10 + 1, "id": id, "title": format!("post {id}"), "body": format!("body {id}")}))
                .collect();
            Self::with_list_payload(Value::Array(posts))
        }

        pub fn with_list_payload(payload: Value) -> Self {
            let remote = Self::default();
            remote.state.lock().unwrap().list_payload = payload;
            remote
        }

        /// Id the remote assigns on create; `None` makes create answer without a payload.
        pub fn set_create_id(&self, id: Option<i32>) { self.state.lock().unwrap().create_id = id; }
        pub fn fail_list(&self, on: bool) { self.state.lock().unwrap().fail_list = on; }
        pub fn fail_create(&self, on: bool) { self.state.lock().unwrap().fail_create = on; }
        pub fn fail_update(&self, on: bool) { self.state.lock().unwrap().fail_update = on; }
        pub fn fail_delete(&self, on: bool) { self.state.lock().unwrap().fail_delete = on; }
        pub fn set_delete_status(&self, status: u16) { self.state.lock().unwrap().delete_status = status; }

        pub fn calls(&self, op: &str) -> usize {
            self.state.lock().unwrap().calls.get(op).copied().unwrap_or(0)
        }

        pub fn total_calls(&self) -> usize {
            self.state.lock().unwrap().calls.values().sum()
        }

        fn record(&self, op: &'static str) -> std::sync::MutexGuard<'_, State> {
            let mut state = self.state.lock().unwrap();
            *state.calls.entry(op).or_default() += 1;
            state
        }
    }

    fn injected(op: &str) -> ServiceError {
        ServiceError::Upstream { status: Some(500), message: format!("injected {op} failure"), cause: None }
    }

    #[async_trait]
    impl RemoteSource for MockRemoteSource {
        async fn list(&self) -> Result<Value, ServiceError> {
            let state = self.record("list");
            if state.fail_list {
                return Err(injected("list"));
            }
            Ok(state.list_payload.clone())
        }

        async fn create(&self, draft: &PostDraft) -> Result<Option<RemotePost>, ServiceError> {
            let state = self.record("create");
            if state.fail_create {
                return Err(injected("create"));
            }
            Ok(state.create_id.map(|id| draft.to_remote(Some(id))))
        }

        async fn update(&self, _id: i32, _draft: &PostDraft) -> Result<(), ServiceError> {
            let state = self.record("update");
            if state.fail_update {
                return Err(injected("update"));
            }
            Ok(())
        }

        async fn delete(&self, _id: i32) -> Result<u16, ServiceError> {
            let state = self.record("delete");
            if state.fail_delete {
                return Err(injected("delete"));
            }
            Ok(state.delete_status)
        }
    }
}
