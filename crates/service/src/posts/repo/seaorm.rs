use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set, TransactionTrait};
use tracing::debug;

use models::post;

use crate::errors::ServiceError;
use crate::posts::domain::{NewPost, Post, PostDraft, PostOrder};
use crate::posts::repository::PostRepository;

// Keeps bound parameters per statement well under SQLite's limit.
const INSERT_CHUNK: usize = 100;

/// SeaORM-backed post store (PostgreSQL in production, SQLite in tests).
#[derive(Clone)]
pub struct SeaOrmPostRepository {
    pub db: DatabaseConnection,
}

impl SeaOrmPostRepository {
    pub fn new(db: DatabaseConnection) -> Self { Self { db } }
}

fn active_model(p: NewPost) -> post::ActiveModel {
    let now = Utc::now().into();
    post::ActiveModel {
        id: Set(p.id),
        user_id: Set(p.user_id),
        title: Set(p.title),
        body: Set(p.body),
        created_at: Set(now),
        updated_at: Set(now),
    }
}

#[async_trait::async_trait]
impl PostRepository for SeaOrmPostRepository {
    async fn find_all(&self, order: PostOrder) -> Result<Vec<Post>, ServiceError> {
        let mut select = post::Entity::find();
        if order == PostOrder::IdAsc {
            select = select.order_by_asc(post::Column::Id);
        }
        Ok(select.all(&self.db).await?)
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<Post>, ServiceError> {
        Ok(post::Entity::find_by_id(id).one(&self.db).await?)
    }

    async fn find_max_id(&self) -> Result<Option<i32>, ServiceError> {
        let last = post::Entity::find()
            .order_by_desc(post::Column::Id)
            .one(&self.db)
            .await?;
        Ok(last.map(|p| p.id))
    }

    async fn insert_many(&self, posts: Vec<NewPost>) -> Result<u64, ServiceError> {
        let total = posts.len() as u64;
        // one transaction, so a failed chunk leaves the table as it was
        let txn = self.db.begin().await?;
        let mut rows = posts.into_iter().map(active_model).peekable();
        while rows.peek().is_some() {
            let chunk: Vec<post::ActiveModel> = rows.by_ref().take(INSERT_CHUNK).collect();
            debug!(rows = chunk.len(), "bulk inserting posts");
            post::Entity::insert_many(chunk).exec(&txn).await?;
        }
        txn.commit().await?;
        Ok(total)
    }

    async fn create(&self, post: NewPost) -> Result<Post, ServiceError> {
        Ok(active_model(post).insert(&self.db).await?)
    }

    async fn update(&self, id: i32, fields: PostDraft) -> Result<Option<Post>, ServiceError> {
        let Some(found) = post::Entity::find_by_id(id).one(&self.db).await? else {
            return Ok(None);
        };
        let mut am: post::ActiveModel = found.into();
        am.user_id = Set(fields.user_id);
        am.title = Set(fields.title);
        am.body = Set(fields.body);
        am.updated_at = Set(Utc::now().into());
        Ok(Some(am.update(&self.db).await?))
    }

    async fn delete(&self, id: i32) -> Result<Option<Post>, ServiceError> {
        let Some(found) = post::Entity::find_by_id(id).one(&self.db).await? else {
            return Ok(None);
        };
        post::Entity::delete_by_id(id).exec(&self.db).await?;
        Ok(Some(found))
    }
}
