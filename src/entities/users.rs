use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Identifier of the person in the sebacon directory
    #[sea_orm(unique)]
    pub remote_id: String,
    #[sea_orm(column_type = "Json")]
    pub data: Json,
    /// Incremented on every write of `data`
    #[sea_orm(default_value = 0)]
    pub revision: i32,
    pub created_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
