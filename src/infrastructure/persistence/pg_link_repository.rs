//! PostgreSQL implementation of link repository.

use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::entities::{Link, NewLink};
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;

/// PostgreSQL repository for link storage and retrieval.
///
/// Relies on the primary key on `links.code` for uniqueness. Rows are never
/// removed, so a code stays taken for the lifetime of the table.
pub struct PgLinkRepository {
    pool: Arc<PgPool>,
}

impl PgLinkRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LinkRepository for PgLinkRepository {
    async fn create(&self, new_link: NewLink) -> Result<Link, AppError> {
        let row = sqlx::query_as::<_, Link>(
            r#"
            INSERT INTO links (code, target_url, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (code) DO NOTHING
            RETURNING code, target_url, created_at, expires_at, deleted_at
            "#,
        )
        .bind(&new_link.code)
        .bind(&new_link.target_url)
        .bind(new_link.expires_at)
        .fetch_optional(self.pool.as_ref())
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::CodeAlreadyExists { .. } => AppError::already_exists(&new_link.code),
            other => other,
        })?;

        row.ok_or_else(|| AppError::already_exists(new_link.code))
    }

    async fn get(&self, code: &str) -> Result<Link, AppError> {
        let link = sqlx::query_as::<_, Link>(
            r#"
            SELECT code, target_url, created_at, expires_at, deleted_at
            FROM links
            WHERE code = $1
            "#,
        )
        .bind(code)
        .fetch_optional(self.pool.as_ref())
        .await?;

        match link {
            Some(link) if link.is_deleted() => Err(AppError::not_found(code)),
            Some(link) if link.is_expired() => Err(AppError::expired(code)),
            Some(link) => Ok(link),
            None => Err(AppError::not_found(code)),
        }
    }

    async fn delete(&self, code: &str) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE links
            SET deleted_at = NOW()
            WHERE code = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(code)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
