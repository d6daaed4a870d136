//! The page aggregate: a revision log plus lifecycle timestamps.
//!
//! State machine per page: absent → live → trashed → live → … Revisions only
//! accumulate. Every mutation goes through this type; the store persists the
//! result.

use serde::Serialize;

use crate::diff::{self, RevisionDiff};
use crate::error::CoreError;
use crate::permission::{PermissionPolicy, User};
use crate::revision::{Revision, RevisionDraft, RevisionError, RevisionLog, RevisionNumber};
use crate::types::{DbId, PageId, Timestamp};

/// Outcome of a guarded operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    Applied,
    /// Preconditions were not met; nothing changed.
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    id: PageId,
    revisions: RevisionLog,
    created: Timestamp,
    updated: Timestamp,
    trashed: Option<Timestamp>,
}

impl Page {
    /// Start a page whose seed revision is `draft`.
    pub fn create(draft: RevisionDraft, policy: &PermissionPolicy) -> Self {
        let seed = draft.into_revision(policy.default_permissions());
        let now = seed.timestamp();
        Self {
            id: uuid::Uuid::now_v7(),
            revisions: RevisionLog::seed(seed),
            created: now,
            updated: now,
            trashed: None,
        }
    }

    /// Rehydrate a page loaded from the store.
    pub fn from_parts(
        id: PageId,
        revisions: RevisionLog,
        created: Timestamp,
        updated: Timestamp,
        trashed: Option<Timestamp>,
    ) -> Self {
        Self {
            id,
            revisions,
            created,
            updated,
            trashed,
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn id(&self) -> PageId {
        self.id
    }

    pub fn revisions(&self) -> &RevisionLog {
        &self.revisions
    }

    pub fn current(&self) -> &Revision {
        self.revisions.current()
    }

    pub fn revision_count(&self) -> usize {
        self.revisions.len()
    }

    pub fn created(&self) -> Timestamp {
        self.created
    }

    pub fn updated(&self) -> Timestamp {
        self.updated
    }

    pub fn trashed(&self) -> Option<Timestamp> {
        self.trashed
    }

    pub fn is_trashed(&self) -> bool {
        self.trashed.is_some()
    }

    /// Distinct editors, most recent first.
    pub fn editors(&self) -> Vec<DbId> {
        let mut seen = Vec::new();
        for id in self.revisions.iter().filter_map(Revision::editor) {
            if !seen.contains(&id) {
                seen.push(id);
            }
        }
        seen
    }

    // ── Edits ────────────────────────────────────────────────────────

    /// Make `draft` the current revision.
    ///
    /// Missing permissions carry over from the current revision. Content is
    /// accepted verbatim; no comparison against earlier revisions is made.
    pub fn commit(&mut self, draft: RevisionDraft) -> &Revision {
        let inherited = *self.current().permissions();
        let revision = draft.into_revision(inherited);
        self.updated = revision.timestamp();
        self.revisions.push_current(revision);
        self.revisions.current()
    }

    /// [`commit`](Self::commit), but only if the log still has
    /// `expected_revisions` entries. Detects a concurrent edit instead of
    /// silently writing over it.
    pub fn commit_expecting(
        &mut self,
        draft: RevisionDraft,
        expected_revisions: usize,
    ) -> Result<&Revision, CoreError> {
        if self.revision_count() != expected_revisions {
            return Err(CoreError::Conflict(format!(
                "Page {} has {} revisions, expected {expected_revisions}; reload and retry",
                self.id,
                self.revision_count()
            )));
        }
        Ok(self.commit(draft))
    }

    /// Commit a copy of `target`'s content and permissions, edited by
    /// `actor`. No-op when `target` is absent.
    pub fn rollback(&mut self, target: Option<&Revision>, actor: Option<&User>) -> Effect {
        let Some(target) = target else {
            return Effect::Unchanged;
        };
        let draft = RevisionDraft::new(target.content().clone())
            .with_permissions(*target.permissions())
            .with_editor(actor.map(|u| u.id))
            .with_msg(format!(
                "Rolled back to revision from {}",
                target.timestamp().to_rfc3339()
            ));
        let revision = draft.into_revision(*target.permissions());
        self.updated = revision.timestamp();
        self.revisions.push_current(revision);
        Effect::Applied
    }

    /// Roll back to the revision with the given number, if it exists.
    pub fn rollback_to(&mut self, number: RevisionNumber, actor: Option<&User>) -> Effect {
        let target = self.revisions.get(number).ok().cloned();
        self.rollback(target.as_ref(), actor)
    }

    // ── Tombstone ────────────────────────────────────────────────────

    /// Mark the page as soft-deleted. No-op if already trashed.
    pub fn trash(&mut self) -> Effect {
        if self.trashed.is_some() {
            return Effect::Unchanged;
        }
        self.trashed = Some(chrono::Utc::now());
        Effect::Applied
    }

    /// Bring a trashed page back. Counts as an update. No-op if live.
    pub fn untrash(&mut self) -> Effect {
        if self.trashed.is_none() {
            return Effect::Unchanged;
        }
        self.trashed = None;
        self.updated = chrono::Utc::now();
        Effect::Applied
    }

    // ── Lookup & comparison ──────────────────────────────────────────

    pub fn revision(&self, number: RevisionNumber) -> Result<&Revision, RevisionError> {
        self.revisions.get(number)
    }

    /// Parse a caller-supplied ordinal and look the revision up.
    pub fn revision_by_number(&self, raw: &str) -> Result<&Revision, RevisionError> {
        self.revision(RevisionNumber::parse(raw)?)
    }

    /// Normalized diff from revision `a` to revision `b`.
    ///
    /// Both numbers are clamped into `[1, len]`; `None` if either is not an
    /// integer at all.
    pub fn diff_revisions(&self, a: &str, b: &str) -> Option<RevisionDiff> {
        let a = self.revisions.clamp(a.trim().parse().ok()?);
        let b = self.revisions.clamp(b.trim().parse().ok()?);
        let old = self.revisions.get(a).ok()?;
        let new = self.revisions.get(b).ok()?;
        Some(diff::diff(old, new).normalize())
    }
}

/// Roll back a page that may not have been found. No-op if either the page
/// or the target is absent.
pub fn rollback(
    page: Option<&mut Page>,
    target: Option<&Revision>,
    actor: Option<&User>,
) -> Effect {
    match page {
        Some(page) => page.rollback(target, actor),
        None => Effect::Unchanged,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::config::WikiConfig;
    use crate::content::Content;
    use crate::diff::new_text;
    use crate::permission::{PermissionLevel, Permissions};

    fn policy() -> PermissionPolicy {
        PermissionPolicy::new(&WikiConfig::default())
    }

    fn draft(title: &str, body: &str, editor: Option<DbId>) -> RevisionDraft {
        RevisionDraft::new(Content::new(title, None, body).unwrap()).with_editor(editor)
    }

    /// Page with bodies "v1", "v2", "v3" committed in that order.
    fn three_revision_page() -> Page {
        let policy = policy();
        let mut page = Page::create(draft("Home", "v1", Some(1)), &policy);
        page.commit(draft("Home", "v2", Some(2)));
        page.commit(draft("Home", "v3", Some(3)));
        page
    }

    // -- create --------------------------------------------------------------

    #[test]
    fn create_seeds_one_revision_with_config_defaults() {
        let config = WikiConfig {
            default_read: PermissionLevel::Authenticated,
            ..WikiConfig::default()
        };
        let page = Page::create(draft("Home", "hi", Some(1)), &PermissionPolicy::new(&config));
        assert_eq!(page.revision_count(), 1);
        assert_eq!(page.current().permissions().read, PermissionLevel::Authenticated);
        assert_eq!(page.current().permissions().write, PermissionLevel::Editor);
        assert_eq!(page.created(), page.updated());
        assert!(!page.is_trashed());
    }

    // -- commit --------------------------------------------------------------

    #[test]
    fn commit_front_inserts_and_grows_by_one() {
        let policy = policy();
        let mut page = Page::create(draft("Home", "v1", None), &policy);
        let before = page.revision_count();

        let committed = page.commit(draft("Home", "v2", Some(5))).clone();

        assert_eq!(page.revision_count(), before + 1);
        assert_eq!(page.revisions().as_slice()[0], committed);
        assert_eq!(page.current().content().body(), "v2");
        assert_eq!(page.updated(), committed.timestamp());
    }

    #[test]
    fn commit_inherits_current_permissions() {
        let policy = policy();
        let locked = Permissions {
            read: PermissionLevel::Editor,
            write: PermissionLevel::Admin,
        };
        let mut page = Page::create(draft("Home", "v1", None).with_permissions(locked), &policy);
        page.commit(draft("Home", "v2", None));
        assert_eq!(*page.current().permissions(), locked);
    }

    #[test]
    fn commit_expecting_detects_concurrent_edit() {
        let mut page = three_revision_page();
        assert_matches!(
            page.commit_expecting(draft("Home", "late", None), 2),
            Err(CoreError::Conflict(_))
        );
        assert_eq!(page.revision_count(), 3);
        assert!(page.commit_expecting(draft("Home", "v4", None), 3).is_ok());
        assert_eq!(page.revision_count(), 4);
    }

    // -- rollback ------------------------------------------------------------

    #[test]
    fn rollback_copies_target_and_records_actor() {
        let mut page = three_revision_page();
        let target = page.revision_by_number("1").unwrap().clone();
        let actor = User::member(42);

        assert_eq!(page.rollback(Some(&target), Some(&actor)), Effect::Applied);

        assert_eq!(page.revision_count(), 4);
        assert_eq!(page.current().content(), target.content());
        assert_eq!(page.current().permissions(), target.permissions());
        assert_eq!(page.current().editor(), Some(42));
        assert!(page.current().timestamp() >= target.timestamp());
    }

    #[test]
    fn rollback_without_target_is_noop() {
        let mut page = three_revision_page();
        assert_eq!(page.rollback(None, None), Effect::Unchanged);
        assert_eq!(page.revision_count(), 3);
    }

    #[test]
    fn rollback_without_page_is_noop() {
        let page = three_revision_page();
        let target = page.current().clone();
        assert_eq!(rollback(None, Some(&target), None), Effect::Unchanged);
    }

    #[test]
    fn rollback_to_out_of_range_is_noop() {
        let mut page = three_revision_page();
        let number = RevisionNumber::new(9).unwrap();
        assert_eq!(page.rollback_to(number, None), Effect::Unchanged);
        let number = RevisionNumber::new(2).unwrap();
        assert_eq!(page.rollback_to(number, None), Effect::Applied);
        assert_eq!(page.current().content().body(), "v2");
    }

    // -- trash / untrash -----------------------------------------------------

    #[test]
    fn trash_then_untrash_round_trips() {
        let mut page = three_revision_page();
        let original = page.clone();

        assert_eq!(page.trash(), Effect::Applied);
        assert!(page.trashed().is_some());
        assert_eq!(page.updated(), original.updated());

        assert_eq!(page.untrash(), Effect::Applied);
        assert!(page.trashed().is_none());
        assert_eq!(page.id(), original.id());
        assert_eq!(page.revisions(), original.revisions());
        assert_eq!(page.created(), original.created());
        assert!(page.updated() >= original.updated());
    }

    #[test]
    fn trash_and_untrash_are_guarded() {
        let mut page = three_revision_page();
        assert_eq!(page.untrash(), Effect::Unchanged);
        page.trash();
        let stamp = page.trashed();
        assert_eq!(page.trash(), Effect::Unchanged);
        assert_eq!(page.trashed(), stamp);
    }

    // -- revision_by_number --------------------------------------------------

    #[test]
    fn revision_numbers_on_three_revision_page() {
        let page = three_revision_page();
        assert_eq!(page.revision_by_number("1").unwrap().content().body(), "v1");
        assert_eq!(page.revision_by_number("2").unwrap().content().body(), "v2");
        assert_eq!(page.revision_by_number("3").unwrap().content().body(), "v3");

        assert_matches!(page.revision_by_number("0"), Err(RevisionError::Invalid { .. }));
        assert_matches!(page.revision_by_number("abc"), Err(RevisionError::Invalid { .. }));
        assert_matches!(
            page.revision_by_number("4"),
            Err(RevisionError::NotFound { number: 4, available: 3 })
        );
    }

    // -- diff_revisions ------------------------------------------------------

    #[test]
    fn diff_between_revisions() {
        let page = three_revision_page();
        let d = page.diff_revisions("1", "3").unwrap();
        assert_eq!(new_text(&d.content.body), "v3");
        assert!(!d.is_unchanged());
    }

    #[test]
    fn diff_clamps_out_of_range_numbers() {
        let page = three_revision_page();
        let clamped = page.diff_revisions("-4", "99").unwrap();
        let explicit = page.diff_revisions("1", "3").unwrap();
        assert_eq!(clamped, explicit);
    }

    #[test]
    fn diff_with_unparsable_number_is_none() {
        let page = three_revision_page();
        assert!(page.diff_revisions("one", "2").is_none());
        assert!(page.diff_revisions("1", "").is_none());
    }

    // -- editors -------------------------------------------------------------

    #[test]
    fn editors_are_distinct_and_newest_first() {
        let mut page = three_revision_page();
        page.commit(draft("Home", "v4", Some(1)));
        assert_eq!(page.editors(), vec![1, 3, 2]);
    }
}
