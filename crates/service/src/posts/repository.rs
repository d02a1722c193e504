use async_trait::async_trait;

use super::domain::{NewPost, Post, PostDraft, PostOrder};
use crate::errors::ServiceError;

/// Persistence for post records. Driver failures surface as [`ServiceError::Storage`].
#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn find_all(&self, order: PostOrder) -> Result<Vec<Post>, ServiceError>;
    async fn find_by_id(&self, id: i32) -> Result<Option<Post>, ServiceError>;
    async fn find_max_id(&self) -> Result<Option<i32>, ServiceError>;
    /// Bulk insert; returns the number of rows written.
    async fn insert_many(&self, posts: Vec<NewPost>) -> Result<u64, ServiceError>;
    async fn create(&self, post: NewPost) -> Result<Post, ServiceError>;
    /// Overwrite all mutable fields. `None` when no row has this id.
    async fn update(&self, id: i32, fields: PostDraft) -> Result<Option<Post>, ServiceError>;
    /// Remove a row, returning what was deleted.
    async fn delete(&self, id: i32) -> Result<Option<Post>, ServiceError>;
}

/// Simple in-memory mock repository for tests and doc examples
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use chrono::Utc;

    #[derive(Default)]
    pub struct InMemoryPostRepository {
        posts: Mutex<Vec<Post>>, // insertion order
        fail_writes: AtomicBool,
    }

    impl InMemoryPostRepository {
        pub fn with_posts(posts: impl IntoIterator<Item = NewPost>) -> Self {
            let repo = Self::default();
            {
                let mut rows = repo.posts.lock().unwrap();
                rows.extend(posts.into_iter().map(to_model));
            }
            repo
        }

        /// Make every write fail with a storage error.
        pub fn fail_writes(&self, on: bool) {
            self.fail_writes.store(on, Ordering::SeqCst);
        }

        pub fn snapshot(&self) -> Vec<Post> {
            self.posts.lock().unwrap().clone()
        }

        fn check_writable(&self) -> Result<(), ServiceError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(ServiceError::Storage("injected write failure".into()));
            }
            Ok(())
        }
    }

    fn to_model(p: NewPost) -> Post {
        let now = Utc::now().into();
        Post { id: p.id, user_id: p.user_id, title: p.title, body: p.body, created_at: now, updated_at: now }
    }

    #[async_trait]
    impl PostRepository for InMemoryPostRepository {
        async fn find_all(&self, order: PostOrder) -> Result<Vec<Post>, ServiceError> {
            let mut rows = self.posts.lock().unwrap().clone();
            if order == PostOrder::IdAsc {
                rows.sort_by_key(|p| p.id);
            }
            Ok(rows)
        }

        async fn find_by_id(&self, id: i32) -> Result<Option<Post>, ServiceError> {
            Ok(self.posts.lock().unwrap().iter().find(|p| p.id == id).cloned())
        }

        async fn find_max_id(&self) -> Result<Option<i32>, ServiceError> {
            Ok(self.posts.lock().unwrap().iter().map(|p| p.id).max())
        }

        async fn insert_many(&self, posts: Vec<NewPost>) -> Result<u64, ServiceError> {
            self.check_writable()?;
            let mut rows = self.posts.lock().unwrap();
            if let Some(dup) = posts.iter().find(|n| rows.iter().any(|p| p.id == n.id)) {
                return Err(ServiceError::Storage(format!("duplicate post id {}", dup.id)));
            }
            let count = posts.len() as u64;
            rows.extend(posts.into_iter().map(to_model));
            Ok(count)
        }

        async fn create(&self, post: NewPost) -> Result<Post, ServiceError> {
            self.check_writable()?;
            let mut rows = self.posts.lock().unwrap();
            if rows.iter().any(|p| p.id == post.id) {
                return Err(ServiceError::Storage(format!("duplicate post id {}", post.id)));
            }
            let model = to_model(post);
            rows.push(model.clone());
            Ok(model)
        }

        async fn update(&self, id: i32, fields: PostDraft) -> Result<Option<Post>, ServiceError> {
            self.check_writable()?;
            let mut rows = self.posts.lock().unwrap();
            Ok(rows.iter_mut().find(|p| p.id == id).map(|p| {
                p.user_id = fields.user_id;
                p.title = fields.title;
                p.body = fields.body;
                p.updated_at = Utc::now().into();
                p.clone()
            }))
        }

        async fn delete(&self, id: i32) -> Result<Option<Post>, ServiceError> {
            self.check_writable()?;
            let mut rows = self.posts.lock().unwrap();
            Ok(rows.iter().position(|p| p.id == id).map(|i| rows.remove(i)))
        }
    }
}
