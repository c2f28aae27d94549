//! Repository for the `parents` table.

use sqlx::PgPool;
use schoolnet_core::types::DbId;

use crate::models::user::Parent;

const COLUMNS: &str = "id, user_id, cc_email, created_at, updated_at";

/// Provides CRUD operations for parent profiles.
pub struct ParentRepo;

impl ParentRepo {
    pub async fn create(
        pool: &PgPool,
        user_id: DbId,
        cc_email: Option<&str>,
    ) -> Result<Parent, sqlx::Error> {
        let query = format!(
            "INSERT INTO parents (user_id, cc_email) VALUES ($1, $2) RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Parent>(&query)
            .bind(user_id)
            .bind(cc_email)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Parent>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM parents WHERE id = $1");
        sqlx::query_as::<_, Parent>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_user_id(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Option<Parent>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM parents WHERE user_id = $1");
        sqlx::query_as::<_, Parent>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }
}
