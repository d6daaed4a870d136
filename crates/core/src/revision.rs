//! Revisions, the newest-first revision log, and revision numbering.
//!
//! Revision numbers are chronological: revision 1 is the seed revision and
//! revision `len` is the current one. Storage order is the reverse (index 0
//! is current); [`RevisionLog::get`] is the only place that maps one onto the
//! other.

use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

use crate::content::Content;
use crate::error::CoreError;
use crate::permission::Permissions;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Revision
// ---------------------------------------------------------------------------

/// An immutable snapshot of a page. Built only from a [`RevisionDraft`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    content: Content,
    permissions: Permissions,
    editor: Option<DbId>,
    msg: Option<String>,
    timestamp: Timestamp,
}

impl Revision {
    pub fn content(&self) -> &Content {
        &self.content
    }

    pub fn permissions(&self) -> &Permissions {
        &self.permissions
    }

    pub fn editor(&self) -> Option<DbId> {
        self.editor
    }

    pub fn msg(&self) -> Option<&str> {
        self.msg.as_deref()
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}

/// Input for a new revision. Only `content` is required.
#[derive(Debug, Clone, Deserialize)]
pub struct RevisionDraft {
    pub content: Content,
    pub permissions: Option<Permissions>,
    pub editor: Option<DbId>,
    pub msg: Option<String>,
}

impl RevisionDraft {
    pub fn new(content: Content) -> Self {
        Self {
            content,
            permissions: None,
            editor: None,
            msg: None,
        }
    }

    pub fn with_permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = Some(permissions);
        self
    }

    pub fn with_editor(mut self, editor: Option<DbId>) -> Self {
        self.editor = editor;
        self
    }

    pub fn with_msg(mut self, msg: impl Into<String>) -> Self {
        self.msg = Some(msg.into());
        self
    }

    /// Freeze the draft, stamped now. Missing permissions take `fallback`.
    pub fn into_revision(self, fallback: Permissions) -> Revision {
        self.into_revision_at(fallback, chrono::Utc::now())
    }

    pub fn into_revision_at(self, fallback: Permissions, timestamp: Timestamp) -> Revision {
        Revision {
            content: self.content,
            permissions: self.permissions.unwrap_or(fallback),
            editor: self.editor,
            msg: self.msg.filter(|m| !m.trim().is_empty()),
            timestamp,
        }
    }
}

// ---------------------------------------------------------------------------
// Revision numbers
// ---------------------------------------------------------------------------

/// Why a revision lookup failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RevisionError {
    /// The caller sent something that is not a positive integer.
    #[error("Invalid revision number '{raw}'")]
    Invalid { raw: String },

    /// A well-formed number outside `[1, available]`.
    #[error("Revision {number} not found ({available} available)")]
    NotFound { number: usize, available: usize },
}

impl From<RevisionError> for CoreError {
    fn from(err: RevisionError) -> Self {
        match err {
            RevisionError::Invalid { .. } => CoreError::Validation(err.to_string()),
            RevisionError::NotFound { number, .. } => CoreError::not_found("revision", number),
        }
    }
}

/// A validated 1-based chronological revision number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RevisionNumber(NonZeroUsize);

impl RevisionNumber {
    /// Parse a caller-supplied ordinal. Anything but a positive integer is
    /// [`RevisionError::Invalid`].
    pub fn parse(raw: &str) -> Result<Self, RevisionError> {
        raw.trim()
            .parse::<usize>()
            .ok()
            .and_then(NonZeroUsize::new)
            .map(Self)
            .ok_or_else(|| RevisionError::Invalid {
                raw: raw.to_string(),
            })
    }

    pub fn new(number: usize) -> Option<Self> {
        NonZeroUsize::new(number).map(Self)
    }

    pub fn get(self) -> usize {
        self.0.get()
    }
}

impl std::fmt::Display for RevisionNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Revision log
// ---------------------------------------------------------------------------

/// A non-empty, newest-first sequence of revisions. Index 0 is current.
///
/// Only [`RevisionLog::push_current`] adds entries, and only the page
/// aggregate calls it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Revision>", into = "Vec<Revision>")]
pub struct RevisionLog(Vec<Revision>);

impl RevisionLog {
    pub(crate) fn seed(revision: Revision) -> Self {
        Self(vec![revision])
    }

    pub(crate) fn push_current(&mut self, revision: Revision) {
        self.0.insert(0, revision);
    }

    pub fn current(&self) -> &Revision {
        &self.0[0]
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Newest first.
    pub fn as_slice(&self) -> &[Revision] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Revision> {
        self.0.iter()
    }

    /// Look up a revision by chronological number.
    pub fn get(&self, number: RevisionNumber) -> Result<&Revision, RevisionError> {
        let n = number.get();
        let available = self.len();
        if n > available {
            return Err(RevisionError::NotFound { number: n, available });
        }
        Ok(&self.0[available - n])
    }

    /// Clamp an arbitrary integer into `[1, len]`.
    pub fn clamp(&self, number: i64) -> RevisionNumber {
        let len = self.len() as i64;
        let clamped = number.clamp(1, len.max(1)) as usize;
        RevisionNumber::new(clamped).unwrap_or(RevisionNumber(NonZeroUsize::MIN))
    }
}

impl TryFrom<Vec<Revision>> for RevisionLog {
    type Error = CoreError;

    fn try_from(revisions: Vec<Revision>) -> Result<Self, Self::Error> {
        if revisions.is_empty() {
            return Err(CoreError::Validation(
                "A page must have at least one revision".into(),
            ));
        }
        Ok(Self(revisions))
    }
}

impl From<RevisionLog> for Vec<Revision> {
    fn from(log: RevisionLog) -> Self {
        log.0
    }
}

impl<'a> IntoIterator for &'a RevisionLog {
    type Item = &'a Revision;
    type IntoIter = std::slice::Iter<'a, Revision>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
