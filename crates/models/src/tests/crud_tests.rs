use anyhow::Result;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, QueryOrder, Set};

use super::memory_db;
use crate::post;

fn active(id: i32, title: &str) -> post::ActiveModel {
    let now = Utc::now().into();
    post::ActiveModel {
        id: Set(id),
        user_id: Set(1),
        title: Set(title.to_string()),
        body: Set(format!("body of {title}")),
        created_at: Set(now),
        updated_at: Set(now),
    }
}

#[tokio::test]
async fn insert_find_update_delete() -> Result<()> {
    let db = memory_db().await?;

    let created = active(7, "seven").insert(&db).await?;
    assert_eq!(created.id, 7);

    let mut am: post::ActiveModel = post::Entity::find_by_id(7).one(&db).await?.expect("row").into();
    am.title = Set("renamed".into());
    let updated = am.update(&db).await?;
    assert_eq!(updated.title, "renamed");

    post::Entity::delete_by_id(7).exec(&db).await?;
    assert!(post::Entity::find_by_id(7).one(&db).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn duplicate_id_is_rejected() -> Result<()> {
    let db = memory_db().await?;
    active(1, "a").insert(&db).await?;
    assert!(active(1, "b").insert(&db).await.is_err());
    Ok(())
}

#[tokio::test]
async fn bulk_insert_then_order_by_id() -> Result<()> {
    let db = memory_db().await?;
    post::Entity::insert_many([active(3, "c"), active(1, "a"), active(2, "b")]).exec(&db).await?;

    let ids: Vec<i32> = post::Entity::find()
        .order_by_asc(post::Column::Id)
        .all(&db)
        .await?
        .into_iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(ids, vec![1, 2, 3]);
    Ok(())
}
