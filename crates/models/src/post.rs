use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "post")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,
    pub user_id: i32,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub body: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

pub const REQUIRED_FIELDS_MESSAGE: &str = "All fields (userId, title, body) are required.";

/// Check the three mandatory fields of a create/update body.
///
/// A zero `userId` or a blank `title`/`body` counts as missing. Present values are kept as sent.
pub fn validate_required(
    user_id: Option<i32>,
    title: Option<&str>,
    body: Option<&str>,
) -> Result<(i32, String, String), errors::ModelError> {
    let user_id = user_id.filter(|u| *u != 0);
    let title = title.filter(|t| !t.trim().is_empty());
    let body = body.filter(|b| !b.trim().is_empty());
    match (user_id, title, body) {
        (Some(u), Some(t), Some(b)) => Ok((u, t.to_string(), b.to_string())),
        _ => Err(errors::ModelError::Validation(REQUIRED_FIELDS_MESSAGE.into())),
    }
}
