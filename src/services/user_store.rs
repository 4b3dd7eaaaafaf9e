use crate::entities::{prelude::*, users};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

/// Attempts before a contended `patch_data` gives up.
const MAX_PATCH_ATTEMPTS: usize = 5;

#[derive(Error, Debug)]
pub enum UserStoreError {
    #[error(transparent)]
    Database(#[from] DbErr),

    #[error("User {0} not found")]
    NotFound(i32),

    #[error("User {0} was modified concurrently")]
    Conflict(i32),
}

/// Access to the `users` table. Profile data is an opaque JSON document.
#[derive(Clone)]
pub struct UserStore {
    db: DatabaseConnection,
}

impl UserStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<users::Model>, DbErr> {
        Users::find_by_id(id).one(&self.db).await
    }

    pub async fn find_all(&self) -> Result<Vec<users::Model>, DbErr> {
        Users::find()
            .order_by_asc(users::Column::Id)
            .all(&self.db)
            .await
    }

    pub async fn create(&self, remote_id: &str, data: Value) -> Result<users::Model, DbErr> {
        users::ActiveModel {
            remote_id: Set(remote_id.to_string()),
            data: Set(data),
            revision: Set(0),
            created_at: Set(Some(Utc::now())),
            ..Default::default()
        }
        .insert(&self.db)
        .await
    }

    /// Replaces the whole document. Last writer wins.
    pub async fn update_data(&self, id: i32, data: Value) -> Result<(), UserStoreError> {
        let result = Users::update_many()
            .col_expr(users::Column::Data, Expr::value(data))
            .col_expr(
                users::Column::Revision,
                Expr::col(users::Column::Revision).add(1),
            )
            .filter(users::Column::Id.eq(id))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(UserStoreError::NotFound(id));
        }
        Ok(())
    }

    /// Read-modify-write of the document guarded by `revision`, so a patch never
    /// silently discards a concurrent write.
    pub async fn patch_data<F>(&self, id: i32, patch: F) -> Result<users::Model, UserStoreError>
    where
        F: Fn(&mut Value),
    {
        for attempt in 1..=MAX_PATCH_ATTEMPTS {
            let user = self
                .find_by_id(id)
                .await?
                .ok_or(UserStoreError::NotFound(id))?;

            let mut data = user.data.clone();
            patch(&mut data);

            let result = Users::update_many()
                .col_expr(users::Column::Data, Expr::value(data.clone()))
                .col_expr(users::Column::Revision, Expr::value(user.revision + 1))
                .filter(users::Column::Id.eq(id))
                .filter(users::Column::Revision.eq(user.revision))
                .exec(&self.db)
                .await?;

            if result.rows_affected == 1 {
                return Ok(users::Model {
                    data,
                    revision: user.revision + 1,
                    ..user
                });
            }

            warn!(
                "Revision conflict patching user {} (attempt {}/{})",
                id, attempt, MAX_PATCH_ATTEMPTS
            );
        }

        Err(UserStoreError::Conflict(id))
    }
}
