//! Access levels and the read/write permission policy.
//!
//! Levels are totally ordered (`anyone < authenticated < editor < admin`) so
//! the query compiler and configuration can compare them, but the read/write
//! checks themselves are one named predicate per level. The admin blanket
//! override lives in [`PermissionPolicy::authorize_read`] /
//! [`PermissionPolicy::authorize_write`], never in [`can_read`] / [`can_write`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::WikiConfig;
use crate::error::CoreError;
use crate::revision::Revision;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Levels
// ---------------------------------------------------------------------------

/// Who may read or write a page revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    Anyone,
    Authenticated,
    Editor,
    Admin,
}

impl PermissionLevel {
    /// Every level, lowest first.
    pub const ALL: [PermissionLevel; 4] = [
        PermissionLevel::Anyone,
        PermissionLevel::Authenticated,
        PermissionLevel::Editor,
        PermissionLevel::Admin,
    ];

    /// String representation for display, logging, and storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anyone => "anyone",
            Self::Authenticated => "authenticated",
            Self::Editor => "editor",
            Self::Admin => "admin",
        }
    }

    /// The named predicate for this level.
    ///
    /// `editor` is satisfied by having edited *any* revision in the history,
    /// not only the current one.
    fn admits(self, user: Option<&User>, revisions: &[Revision]) -> bool {
        match self {
            Self::Anyone => true,
            Self::Authenticated => user.is_some(),
            Self::Editor => user.is_some_and(|u| is_editor(u.id, revisions)),
            Self::Admin => user.is_some_and(|u| u.is_admin),
        }
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionLevel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str() == s)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Invalid permission level '{s}'. Valid levels: anyone, authenticated, editor, admin"
                ))
            })
    }
}

/// Read and write levels attached to a revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    pub read: PermissionLevel,
    pub write: PermissionLevel,
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// The caller identity handed in by the outer auth layer.
///
/// Anonymous callers are represented by `None` wherever a `User` is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: DbId,
    pub is_admin: bool,
}

impl User {
    pub fn member(id: DbId) -> Self {
        Self { id, is_admin: false }
    }

    pub fn admin(id: DbId) -> Self {
        Self { id, is_admin: true }
    }
}

/// Returns `true` if `user_id` is the recorded editor of any revision.
pub fn is_editor(user_id: DbId, revisions: &[Revision]) -> bool {
    revisions.iter().any(|r| r.editor() == Some(user_id))
}

// ---------------------------------------------------------------------------
// Checks
// ---------------------------------------------------------------------------

/// Whether `user` may read a page with this history, judged by the current
/// revision's read level. An empty history is never readable.
pub fn can_read(user: Option<&User>, revisions: &[Revision]) -> bool {
    revisions
        .first()
        .is_some_and(|current| current.permissions().read.admits(user, revisions))
}

/// Whether `user` may write a page with this history, judged by the current
/// revision's write level.
pub fn can_write(user: Option<&User>, revisions: &[Revision]) -> bool {
    revisions
        .first()
        .is_some_and(|current| current.permissions().write.admits(user, revisions))
}

/// Default permissions plus the admin-aware guards used by callers.
#[derive(Debug, Clone)]
pub struct PermissionPolicy {
    defaults: Permissions,
}

impl PermissionPolicy {
    pub fn new(config: &WikiConfig) -> Self {
        Self {
            defaults: Permissions {
                read: config.default_read,
                write: config.default_write,
            },
        }
    }

    /// Permissions applied to a seed revision that does not specify any.
    pub fn default_permissions(&self) -> Permissions {
        self.defaults
    }

    /// Admins always pass; everyone else must satisfy [`can_read`].
    pub fn authorize_read(
        &self,
        user: Option<&User>,
        revisions: &[Revision],
    ) -> Result<(), CoreError> {
        if user.is_some_and(|u| u.is_admin) || can_read(user, revisions) {
            return Ok(());
        }
        Err(deny(user, "read"))
    }

    /// Admins always pass; everyone else must satisfy [`can_write`].
    pub fn authorize_write(
        &self,
        user: Option<&User>,
        revisions: &[Revision],
    ) -> Result<(), CoreError> {
        if user.is_some_and(|u| u.is_admin) || can_write(user, revisions) {
            return Ok(());
        }
        Err(deny(user, "edit"))
    }
}

/// Distinguishes "present credentials" from "you may not".
fn deny(user: Option<&User>, action: &str) -> CoreError {
    match user {
        None => CoreError::Unauthorized(format!("Authentication required to {action} this page")),
        Some(u) => CoreError::Forbidden(format!(
            "User {} is not allowed to {action} this page",
            u.id
        )),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::content::Content;
    use crate::revision::RevisionDraft;

    fn revision(read: PermissionLevel, write: PermissionLevel, editor: Option<DbId>) -> Revision {
        let content = Content::new("Page", None, "body").unwrap();
        RevisionDraft::new(content)
            .with_permissions(Permissions { read, write })
            .with_editor(editor)
            .into_revision(Permissions {
                read: PermissionLevel::Anyone,
                write: PermissionLevel::Anyone,
            })
    }

    fn history(current: PermissionLevel, editors: &[Option<DbId>]) -> Vec<Revision> {
        editors
            .iter()
            .map(|e| revision(current, current, *e))
            .collect()
    }

    // -- PermissionLevel -----------------------------------------------------

    #[test]
    fn levels_are_totally_ordered() {
        assert!(PermissionLevel::Anyone < PermissionLevel::Authenticated);
        assert!(PermissionLevel::Authenticated < PermissionLevel::Editor);
        assert!(PermissionLevel::Editor < PermissionLevel::Admin);
    }

    #[test]
    fn level_parses_from_lowercase_name() {
        for level in PermissionLevel::ALL {
            assert_eq!(level.as_str().parse::<PermissionLevel>().unwrap(), level);
        }
        assert!("Editor".parse::<PermissionLevel>().is_err());
        assert!("".parse::<PermissionLevel>().is_err());
    }

    #[test]
    fn level_serializes_lowercase() {
        let json = serde_json::to_string(&PermissionLevel::Authenticated).unwrap();
        assert_eq!(json, "\"authenticated\"");
    }

    // -- can_read ------------------------------------------------------------

    #[test]
    fn anyone_level_admits_anonymous() {
        let revs = history(PermissionLevel::Anyone, &[None]);
        assert!(can_read(None, &revs));
    }

    #[test]
    fn authenticated_level_requires_identity() {
        let revs = history(PermissionLevel::Authenticated, &[None]);
        assert!(!can_read(None, &revs));
        assert!(can_read(Some(&User::member(7)), &revs));
    }

    #[test]
    fn editor_level_checks_whole_history() {
        // User 3 edited only the oldest revision; ownership still applies.
        let revs = history(PermissionLevel::Editor, &[Some(9), Some(5), Some(3)]);
        assert!(can_read(Some(&User::member(3)), &revs));
        assert!(!can_read(Some(&User::member(4)), &revs));
        assert!(!can_read(None, &revs));
    }

    #[test]
    fn editor_level_is_not_satisfied_by_admin_flag_alone() {
        let revs = history(PermissionLevel::Editor, &[Some(1)]);
        assert!(!can_read(Some(&User::admin(2)), &revs));
    }

    #[test]
    fn admin_level_requires_admin_flag() {
        let revs = history(PermissionLevel::Admin, &[Some(1)]);
        assert!(!can_read(Some(&User::member(1)), &revs));
        assert!(can_read(Some(&User::admin(2)), &revs));
    }

    #[test]
    fn empty_history_is_unreadable() {
        assert!(!can_read(Some(&User::admin(1)), &[]));
        assert!(!can_write(None, &[]));
    }

    #[test]
    fn only_current_revision_levels_apply() {
        let revs = vec![
            revision(PermissionLevel::Authenticated, PermissionLevel::Admin, Some(1)),
            revision(PermissionLevel::Anyone, PermissionLevel::Anyone, Some(1)),
        ];
        assert!(!can_read(None, &revs));
        assert!(!can_write(Some(&User::member(1)), &revs));
    }

    // -- PermissionPolicy ----------------------------------------------------

    #[test]
    fn policy_takes_defaults_from_config() {
        let config = WikiConfig {
            default_read: PermissionLevel::Authenticated,
            default_write: PermissionLevel::Admin,
            ..WikiConfig::default()
        };
        let defaults = PermissionPolicy::new(&config).default_permissions();
        assert_eq!(defaults.read, PermissionLevel::Authenticated);
        assert_eq!(defaults.write, PermissionLevel::Admin);
    }

    #[test]
    fn admin_overrides_every_level() {
        let policy = PermissionPolicy::new(&WikiConfig::default());
        let revs = history(PermissionLevel::Editor, &[Some(1)]);
        assert!(policy.authorize_read(Some(&User::admin(99)), &revs).is_ok());
        assert!(policy.authorize_write(Some(&User::admin(99)), &revs).is_ok());
    }

    #[test]
    fn anonymous_denial_is_unauthorized() {
        let policy = PermissionPolicy::new(&WikiConfig::default());
        let revs = history(PermissionLevel::Authenticated, &[None]);
        assert_matches!(
            policy.authorize_read(None, &revs),
            Err(CoreError::Unauthorized(_))
        );
    }

    #[test]
    fn identified_denial_is_forbidden() {
        let policy = PermissionPolicy::new(&WikiConfig::default());
        let revs = history(PermissionLevel::Editor, &[Some(1)]);
        assert_matches!(
            policy.authorize_write(Some(&User::member(2)), &revs),
            Err(CoreError::Forbidden(_))
        );
    }
}
