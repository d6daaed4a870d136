//! Page row model.
//!
//! The revision log is stored newest-first as a JSONB array; its element
//! shape is the serde form of [`Revision`].

use folio_core::error::CoreError;
use folio_core::page::Page;
use folio_core::revision::{Revision, RevisionLog};
use folio_core::types::{PageId, Timestamp};
use sqlx::types::Json;
use sqlx::FromRow;

/// A row from the `pages` table.
#[derive(Debug, Clone, FromRow)]
pub struct PageRow {
    pub id: PageId,
    pub revisions: Json<Vec<Revision>>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub trashed_at: Option<Timestamp>,
}

impl TryFrom<PageRow> for Page {
    type Error = CoreError;

    fn try_from(row: PageRow) -> Result<Self, Self::Error> {
        let revisions = RevisionLog::try_from(row.revisions.0).map_err(|_| {
            CoreError::Internal(format!("Page {} has an empty revision history", row.id))
        })?;
        Ok(Page::from_parts(
            row.id,
            revisions,
            row.created_at,
            row.updated_at,
            row.trashed_at,
        ))
    }
}
