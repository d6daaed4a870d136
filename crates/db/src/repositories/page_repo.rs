//! Repository for the `pages` table.
//!
//! The revision log is written as a whole. Writers pass the log length they
//! loaded and the update only lands if the stored log still has that many
//! entries.

use folio_core::page::Page;
use folio_core::pagination::Window;
use folio_core::query::Predicate;
use folio_core::revision::RevisionLog;
use folio_core::types::{PageId, Timestamp};
use sqlx::types::Json;
use sqlx::{PgPool, QueryBuilder};

use crate::filter::push_predicate;
use crate::models::page::PageRow;

/// Column list for pages queries.
const COLUMNS: &str = "id, revisions, created_at, updated_at, trashed_at";

/// Provides CRUD and search operations for pages.
pub struct PageRepo;

impl PageRepo {
    /// Insert a freshly created page, returning the stored row.
    pub async fn create(pool: &PgPool, page: &Page) -> Result<PageRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO pages (id, revisions, created_at, updated_at, trashed_at)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PageRow>(&query)
            .bind(page.id())
            .bind(Json(page.revisions().as_slice()))
            .bind(page.created())
            .bind(page.updated())
            .bind(page.trashed())
            .fetch_one(pool)
            .await
    }

    /// Find a page by ID, trashed or not.
    pub async fn find_by_id(pool: &PgPool, id: PageId) -> Result<Option<PageRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM pages WHERE id = $1");
        sqlx::query_as::<_, PageRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find the live page whose current revision has the given path.
    pub async fn find_by_path(pool: &PgPool, path: &str) -> Result<Option<PageRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM pages
             WHERE revisions->0->'content'->>'path' = $1 AND trashed_at IS NULL"
        );
        sqlx::query_as::<_, PageRow>(&query)
            .bind(path)
            .fetch_optional(pool)
            .await
    }

    /// Replace the revision log if it still has `expected_len` entries.
    /// Returns `false` when another writer got there first.
    pub async fn save_revisions(
        pool: &PgPool,
        id: PageId,
        revisions: &RevisionLog,
        updated_at: Timestamp,
        expected_len: usize,
    ) -> Result<bool, sqlx::Error> {
        let expected_len = i32::try_from(expected_len).unwrap_or(i32::MAX);
        let result = sqlx::query(
            "UPDATE pages SET revisions = $2, updated_at = $3
             WHERE id = $1 AND jsonb_array_length(revisions) = $4",
        )
        .bind(id)
        .bind(Json(revisions.as_slice()))
        .bind(updated_at)
        .bind(expected_len)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Soft-delete a page. Returns `true` if a live row was trashed.
    pub async fn trash(
        pool: &PgPool,
        id: PageId,
        trashed_at: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE pages SET trashed_at = $2 WHERE id = $1 AND trashed_at IS NULL",
        )
        .bind(id)
        .bind(trashed_at)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Restore a trashed page. Returns `true` if a row was restored.
    pub async fn restore(
        pool: &PgPool,
        id: PageId,
        updated_at: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE pages SET trashed_at = NULL, updated_at = $2
             WHERE id = $1 AND trashed_at IS NOT NULL",
        )
        .bind(id)
        .bind(updated_at)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Rows matching `predicate` inside `window`, most recently updated first.
    pub async fn search(
        pool: &PgPool,
        predicate: &Predicate,
        window: &Window,
    ) -> Result<Vec<PageRow>, sqlx::Error> {
        let mut qb = QueryBuilder::new(format!("SELECT {COLUMNS} FROM pages WHERE "));
        push_predicate(&mut qb, predicate);
        qb.push(" ORDER BY updated_at DESC, id LIMIT ")
            .push_bind(window.limit)
            .push(" OFFSET ")
            .push_bind(window.start);
        qb.build_query_as::<PageRow>().fetch_all(pool).await
    }

    /// Number of rows matching `predicate`.
    pub async fn count(pool: &PgPool, predicate: &Predicate) -> Result<i64, sqlx::Error> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM pages WHERE ");
        push_predicate(&mut qb, predicate);
        qb.build_query_scalar::<i64>().fetch_one(pool).await
    }
}
