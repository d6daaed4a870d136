//! Folio core: the versioned wiki page model.
//!
//! Pure domain logic with no I/O: the permission policy, content and revision
//! value objects, the page aggregate, the word-level diff engine, the
//! access-control query compiler, and the pagination engine. The `folio-db`
//! crate wires these to PostgreSQL.

pub mod config;
pub mod content;
pub mod diff;
pub mod error;
pub mod page;
pub mod pagination;
pub mod permission;
pub mod query;
pub mod revision;
pub mod types;
