use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use common::metrics;

use super::domain::{NewPost, Post, PostInput, PostOrder, RemoteSync, UpdatedPost};
use super::remote::{RemotePost, RemoteSource};
use super::repository::PostRepository;
use crate::errors::ServiceError;

const FETCH_FAILED: &str = "Failed to fetch data from external API.";
const CREATE_FAILED: &str = "Failed to create post in external API.";
const DELETE_FAILED: &str = "Failed to delete post from external API.";

/// Keeps the local store as a lazily populated cache of the remote posts API.
///
/// Reads are served locally once the store has been seeded. Create and delete
/// go to the remote first and abort if it fails; update writes locally even
/// when the remote write fails.
pub struct PostSyncService {
    repo: Arc<dyn PostRepository>,
    remote: Arc<dyn RemoteSource>,
    // single-flight guard for seeding an empty store
    populate: Mutex<()>,
}

impl PostSyncService {
    pub fn new(repo: Arc<dyn PostRepository>, remote: Arc<dyn RemoteSource>) -> Self {
        Self { repo, remote, populate: Mutex::new(()) }
    }

    /// Return stored posts as-is, seeding from the remote when the store is empty.
    #[instrument(skip(self))]
    pub async fn fetch_and_store(&self) -> Result<Vec<Post>, ServiceError> {
        self.populate_if_empty(PostOrder::Insertion).await
    }

    /// All posts ordered by id, seeding from the remote when the store is empty.
    #[instrument(skip(self))]
    pub async fn get_all(&self) -> Result<Vec<Post>, ServiceError> {
        self.populate_if_empty(PostOrder::IdAsc).await
    }

    #[instrument(skip(self))]
    pub async fn get_by_id(&self, id: i32) -> Result<Post, ServiceError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Post not found"))
    }

    /// Create remotely, then store under the remote id (renumbered on local collision).
    #[instrument(skip(self, input))]
    pub async fn create(&self, input: &PostInput) -> Result<Post, ServiceError> {
        let draft = input.validate()?;

        let remote = self
            .remote
            .create(&draft)
            .await
            .map_err(|e| e.upstream_context(CREATE_FAILED))?;
        let remote_id = remote
            .and_then(|p| p.id)
            .ok_or_else(|| ServiceError::upstream(CREATE_FAILED))?;
        debug!(remote_id, "remote assigned id");

        let id = if self.repo.find_by_id(remote_id).await?.is_some() {
            let next = self.repo.find_max_id().await?.map_or(1, |max| max + 1);
            info!(remote_id, id = next, "remote id already stored locally; renumbering");
            next
        } else {
            remote_id
        };

        let post = self.repo.create(NewPost::from_draft(id, draft)).await?;
        info!(id = post.id, user_id = post.user_id, "post created");
        Ok(post)
    }

    /// Overwrite a stored post. The remote write is attempted but its outcome never blocks the local one.
    #[instrument(skip(self, input))]
    pub async fn update(&self, id: i32, input: &PostInput) -> Result<UpdatedPost, ServiceError> {
        let draft = input.validate()?;

        if self.repo.find_by_id(id).await?.is_none() {
            return Err(ServiceError::not_found("Post not found in database"));
        }

        let remote = match self.remote.update(id, &draft).await {
            Ok(()) => RemoteSync::Synced,
            Err(e) => {
                warn!(id, error = %e, "remote update failed; continuing with local update");
                RemoteSync::Failed(e.to_string())
            }
        };

        let post = self
            .repo
            .update(id, draft)
            .await?
            .ok_or_else(|| ServiceError::Storage("Failed to update post in database.".into()))?;
        info!(id, remote_synced = remote.is_synced(), "post updated");
        Ok(UpdatedPost { post, remote })
    }

    /// Delete remotely, then locally. A failed remote delete leaves the local row alone.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<Post, ServiceError> {
        let status = self
            .remote
            .delete(id)
            .await
            .map_err(|e| e.upstream_context(DELETE_FAILED))?;
        if !(200..300).contains(&status) {
            warn!(id, status, "remote delete rejected");
            return Err(ServiceError::Upstream {
                status: Some(status),
                message: DELETE_FAILED.into(),
                cause: None,
            });
        }

        let post = self
            .repo
            .delete(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Post not found"))?;
        info!(id, "post deleted");
        Ok(post)
    }

    async fn populate_if_empty(&self, order: PostOrder) -> Result<Vec<Post>, ServiceError> {
        let existing = self.repo.find_all(order).await?;
        if !existing.is_empty() {
            debug!(count = existing.len(), "serving posts from local store");
            return Ok(existing);
        }

        let _guard = self.populate.lock().await;
        // Another request may have seeded the store while we waited.
        let existing = self.repo.find_all(order).await?;
        if !existing.is_empty() {
            return Ok(existing);
        }

        info!("local store empty; fetching posts from remote source");
        let payload = self
            .remote
            .list()
            .await
            .map_err(|e| e.upstream_context(FETCH_FAILED))?;
        let rows = seed_rows(payload)?;
        let inserted = self.repo.insert_many(rows).await?;
        metrics::SEEDED_TOTAL.inc_by(inserted);
        info!(inserted, "seeded local store from remote source");

        self.repo.find_all(PostOrder::IdAsc).await
    }
}

/// Turn the remote list payload into rows. Anything but a non-empty array of
/// posts carrying `id`, `userId` and a non-blank `title` and `body` is rejected.
fn seed_rows(payload: Value) -> Result<Vec<NewPost>, ServiceError> {
    let items = match payload {
        Value::Array(items) if !items.is_empty() => items,
        _ => return Err(ServiceError::upstream(FETCH_FAILED)),
    };
    items
        .into_iter()
        .map(|item| {
            let remote: RemotePost = serde_json::from_value(item)
                .map_err(|e| ServiceError::upstream(e.to_string()).upstream_context(FETCH_FAILED))?;
            let id = remote
                .id
                .ok_or_else(|| ServiceError::upstream("remote post without id").upstream_context(FETCH_FAILED))?;
            let (user_id, title, body) =
                models::post::validate_required(remote.user_id, Some(remote.title.as_str()), Some(remote.body.as_str()))
                    .map_err(|e| ServiceError::upstream(format!("remote post {id}: {e}")).upstream_context(FETCH_FAILED))?;
            Ok(NewPost { id, user_id, title, body })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::posts::remote::mock::MockRemoteSource;
    use crate::posts::repository::mock::InMemoryPostRepository;
    use serde_json::json;

    fn stored(id: i32) -> NewPost {
        NewPost { id, user_id: 1, title: format!("local {id}"), body: "b".into() }
    }

    fn service(repo: &Arc<InMemoryPostRepository>, remote: &Arc<MockRemoteSource>) -> PostSyncService {
        PostSyncService::new(repo.clone(), remote.clone())
    }

    fn ids(posts: &[Post]) -> Vec<i32> {
        posts.iter().map(|p| p.id).collect()
    }

    #[tokio::test]
    async fn get_all_seeds_once_then_serves_locally() {
        let repo = Arc::new(InMemoryPostRepository::default());
        let remote = Arc::new(MockRemoteSource::seeded(5));
        let svc = service(&repo, &remote);

        let first = svc.get_all().await.unwrap();
        assert_eq!(ids(&first), vec![1, 2, 3, 4, 5]);
        assert_eq!(remote.calls("list"), 1);
        assert_eq!(repo.snapshot().len(), 5);

        let second = svc.get_all().await.unwrap();
        assert_eq!(second.len(), 5);
        assert_eq!(remote.calls("list"), 1);
    }

    #[tokio::test]
    async fn concurrent_first_reads_fetch_once() {
        let repo = Arc::new(InMemoryPostRepository::default());
        let remote = Arc::new(MockRemoteSource::seeded(3));
        let svc = service(&repo, &remote);

        let (a, b) = tokio::join!(svc.get_all(), svc.fetch_and_store());
        assert_eq!(a.unwrap().len(), 3);
        assert_eq!(b.unwrap().len(), 3);
        assert_eq!(remote.calls("list"), 1);
        assert_eq!(repo.snapshot().len(), 3);
    }

    #[tokio::test]
    async fn fetch_and_store_returns_existing_in_insertion_order() {
        let repo = Arc::new(InMemoryPostRepository::with_posts([stored(9), stored(2)]));
        let remote = Arc::new(MockRemoteSource::seeded(3));
        let svc = service(&repo, &remote);

        assert_eq!(ids(&svc.fetch_and_store().await.unwrap()), vec![9, 2]);
        assert_eq!(ids(&svc.get_all().await.unwrap()), vec![2, 9]);
        assert_eq!(remote.total_calls(), 0);
    }

    #[tokio::test]
    async fn fetch_and_store_sorts_freshly_seeded_posts() {
        let repo = Arc::new(InMemoryPostRepository::default());
        let remote = Arc::new(MockRemoteSource::with_list_payload(json!([
            {"userId": 1, "id": 3, "title": "c", "body": "c"},
            {"userId": 1, "id": 1, "title": "a", "body": "a"},
        ])));
        let svc = service(&repo, &remote);

        assert_eq!(ids(&svc.fetch_and_store().await.unwrap()), vec![1, 3]);
    }

    #[tokio::test]
    async fn malformed_remote_list_is_upstream_error() {
        for payload in [
            json!({"posts": []}),
            json!([]),
            json!(null),
            json!([{"title": "no id"}]),
            json!([{"id": 1, "userId": 1}]),
            json!([{"id": 1, "userId": 1, "title": "t", "body": "  "}]),
        ] {
            let repo = Arc::new(InMemoryPostRepository::default());
            let remote = Arc::new(MockRemoteSource::with_list_payload(payload));
            let svc = service(&repo, &remote);

            let err = svc.get_all().await.unwrap_err();
            assert_eq!(err.kind(), "UpstreamError");
            assert_eq!(err.to_string(), FETCH_FAILED);
            assert!(repo.snapshot().is_empty());
        }
    }

    #[tokio::test]
    async fn remote_list_failure_is_upstream_error() {
        let repo = Arc::new(InMemoryPostRepository::default());
        let remote = Arc::new(MockRemoteSource::seeded(2));
        remote.fail_list(true);
        let svc = service(&repo, &remote);

        let err = svc.fetch_and_store().await.unwrap_err();
        assert!(matches!(err, ServiceError::Upstream { status: Some(500), .. }));
        assert_eq!(err.to_string(), FETCH_FAILED);
    }

    #[tokio::test]
    async fn get_by_id_is_local_only() {
        let repo = Arc::new(InMemoryPostRepository::with_posts([stored(1)]));
        let remote = Arc::new(MockRemoteSource::seeded(10));
        let svc = service(&repo, &remote);

        assert_eq!(svc.get_by_id(1).await.unwrap().title, "local 1");
        let err = svc.get_by_id(999).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        assert_eq!(remote.total_calls(), 0);
    }

    #[tokio::test]
    async fn create_keeps_remote_id_when_free() {
        let repo = Arc::new(InMemoryPostRepository::default());
        let remote = Arc::new(MockRemoteSource::default());
        let svc = service(&repo, &remote);

        let post = svc.create(&PostInput::new(1, "t", "b")).await.unwrap();
        assert_eq!(post.id, 101);
        assert_eq!((post.user_id, post.title.as_str(), post.body.as_str()), (1, "t", "b"));
        assert_eq!(remote.calls("create"), 1);
        assert_eq!(repo.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn create_stores_text_as_sent() {
        let repo = Arc::new(InMemoryPostRepository::default());
        let remote = Arc::new(MockRemoteSource::default());
        let svc = service(&repo, &remote);

        let post = svc.create(&PostInput::new(1, " padded title ", "body\n")).await.unwrap();
        assert_eq!((post.title.as_str(), post.body.as_str()), (" padded title ", "body\n"));
    }

    #[tokio::test]
    async fn create_renumbers_on_local_collision() {
        let repo = Arc::new(InMemoryPostRepository::with_posts([stored(101), stored(150), stored(7)]));
        let remote = Arc::new(MockRemoteSource::default());
        let svc = service(&repo, &remote);

        let post = svc.create(&PostInput::new(1, "t", "b")).await.unwrap();
        assert_eq!(post.id, 151);
        assert!(svc.get_by_id(151).await.is_ok());
    }

    #[tokio::test]
    async fn create_validates_before_calling_remote() {
        let repo = Arc::new(InMemoryPostRepository::default());
        let remote = Arc::new(MockRemoteSource::default());
        let svc = service(&repo, &remote);

        let input = PostInput { user_id: None, title: Some("t".into()), body: Some("b".into()) };
        let err = svc.create(&input).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert_eq!(remote.total_calls(), 0);
    }

    #[tokio::test]
    async fn create_aborts_when_remote_fails_or_is_silent() {
        let repo = Arc::new(InMemoryPostRepository::default());
        let remote = Arc::new(MockRemoteSource::default());
        let svc = service(&repo, &remote);

        remote.fail_create(true);
        let err = svc.create(&PostInput::new(1, "t", "b")).await.unwrap_err();
        assert_eq!(err.to_string(), CREATE_FAILED);
        assert_eq!(err.details(), vec!["remote status 500".to_string(), "injected create failure".to_string()]);

        remote.fail_create(false);
        remote.set_create_id(None);
        let err = svc.create(&PostInput::new(1, "t", "b")).await.unwrap_err();
        assert_eq!(err.kind(), "UpstreamError");
        assert!(repo.snapshot().is_empty());
    }

    #[tokio::test]
    async fn update_succeeds_locally_when_remote_fails() {
        let repo = Arc::new(InMemoryPostRepository::with_posts([stored(150)]));
        let remote = Arc::new(MockRemoteSource::default());
        remote.fail_update(true);
        let svc = service(&repo, &remote);

        let updated = svc.update(150, &PostInput::new(2, "new title", "new body")).await.unwrap();
        assert_eq!(updated.post.id, 150);
        assert_eq!((updated.post.user_id, updated.post.title.as_str()), (2, "new title"));
        assert!(matches!(updated.remote, RemoteSync::Failed(_)));
        assert_eq!(remote.calls("update"), 1);
        assert_eq!(repo.snapshot()[0].body, "new body");
    }

    #[tokio::test]
    async fn update_reports_synced_remote() {
        let repo = Arc::new(InMemoryPostRepository::with_posts([stored(1)]));
        let remote = Arc::new(MockRemoteSource::default());
        let svc = service(&repo, &remote);

        let updated = svc.update(1, &PostInput::new(1, "t2", "b2")).await.unwrap();
        assert_eq!(updated.remote, RemoteSync::Synced);
    }

    #[tokio::test]
    async fn update_missing_post_is_not_found_without_remote_call() {
        let repo = Arc::new(InMemoryPostRepository::default());
        let remote = Arc::new(MockRemoteSource::default());
        let svc = service(&repo, &remote);

        let err = svc.update(42, &PostInput::new(1, "t", "b")).await.unwrap_err();
        assert_eq!(err.to_string(), "Post not found in database");
        assert_eq!(err.status_code(), 404);
        assert_eq!(remote.calls("update"), 0);
    }

    #[tokio::test]
    async fn update_validates_fields() {
        let repo = Arc::new(InMemoryPostRepository::with_posts([stored(1)]));
        let remote = Arc::new(MockRemoteSource::default());
        let svc = service(&repo, &remote);

        let input = PostInput { user_id: Some(1), title: Some("t".into()), body: None };
        assert!(matches!(svc.update(1, &input).await, Err(ServiceError::Validation(_))));
        assert_eq!(remote.total_calls(), 0);
    }

    #[tokio::test]
    async fn update_surfaces_local_storage_failure() {
        let repo = Arc::new(InMemoryPostRepository::with_posts([stored(1)]));
        let remote = Arc::new(MockRemoteSource::default());
        let svc = service(&repo, &remote);
        repo.fail_writes(true);

        let err = svc.update(1, &PostInput::new(1, "t", "b")).await.unwrap_err();
        assert_eq!(err.kind(), "StorageError");
        assert_eq!(err.status_code(), 500);
    }

    #[tokio::test]
    async fn delete_rejected_remotely_keeps_local_row() {
        let repo = Arc::new(InMemoryPostRepository::with_posts([stored(1)]));
        let remote = Arc::new(MockRemoteSource::default());
        remote.set_delete_status(500);
        let svc = service(&repo, &remote);

        let err = svc.delete(1).await.unwrap_err();
        assert!(matches!(err, ServiceError::Upstream { status: Some(500), .. }));
        assert_eq!(err.to_string(), DELETE_FAILED);
        assert_eq!(repo.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn delete_transport_failure_keeps_local_row() {
        let repo = Arc::new(InMemoryPostRepository::with_posts([stored(1)]));
        let remote = Arc::new(MockRemoteSource::default());
        remote.fail_delete(true);
        let svc = service(&repo, &remote);

        assert_eq!(svc.delete(1).await.unwrap_err().kind(), "UpstreamError");
        assert_eq!(repo.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn delete_removes_local_row_after_remote() {
        let repo = Arc::new(InMemoryPostRepository::with_posts([stored(1), stored(2)]));
        let remote = Arc::new(MockRemoteSource::default());
        let svc = service(&repo, &remote);

        let deleted = svc.delete(1).await.unwrap();
        assert_eq!(deleted.id, 1);
        assert_eq!(ids(&repo.snapshot()), vec![2]);

        let err = svc.delete(1).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        assert_eq!(remote.calls("delete"), 2);
    }
}
