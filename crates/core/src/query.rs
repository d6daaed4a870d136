//! Access-control aware search compilation.
//!
//! A searcher identity plus validated [`SearchCriteria`] compile into a
//! [`Predicate`] tree: the conjunction of independently computed clauses,
//! each of which may be omitted. The store renders the tree into its own
//! query language (see `folio_db::filter`); [`Predicate::matches`] evaluates
//! it against pages already in memory.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::content::fold_diacritics;
use crate::error::CoreError;
use crate::page::Page;
use crate::permission::{is_editor, PermissionLevel, User};
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Predicate tree
// ---------------------------------------------------------------------------

/// Fields that can be tested for presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "field", content = "position")]
pub enum ExistsField {
    /// The tombstone timestamp.
    Trashed,
    /// The revision at a 0-based storage position (0 = current).
    Revision(usize),
}

/// Page timestamps that support range checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeField {
    Created,
    Updated,
}

/// A store-agnostic filter over pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "op")]
pub enum Predicate {
    /// All children hold. Empty = match everything.
    And { clauses: Vec<Predicate> },
    /// At least one child holds. Empty = match nothing.
    Or { clauses: Vec<Predicate> },
    /// The current revision's read level equals `level`.
    ReadLevel { level: PermissionLevel },
    /// `user_id` is the editor of at least one revision.
    EditedBy { user_id: DbId },
    /// `field` is present (`exists = true`) or absent.
    Exists { field: ExistsField, exists: bool },
    /// Inclusive bounds on a timestamp; either side may be open.
    Range {
        field: TimeField,
        lower: Option<Timestamp>,
        upper: Option<Timestamp>,
    },
    /// Every whitespace-separated term occurs in the current content.
    Text {
        query: String,
        case_sensitive: bool,
        diacritic_sensitive: bool,
    },
}

impl Predicate {
    /// Conjunction of the clauses that are present.
    pub fn all_of(clauses: impl IntoIterator<Item = Option<Predicate>>) -> Self {
        Predicate::And {
            clauses: clauses.into_iter().flatten().collect(),
        }
    }

    pub fn match_all() -> Self {
        Predicate::And { clauses: Vec::new() }
    }

    /// Evaluate against a materialized page.
    pub fn matches(&self, page: &Page) -> bool {
        match self {
            Predicate::And { clauses } => clauses.iter().all(|c| c.matches(page)),
            Predicate::Or { clauses } => clauses.iter().any(|c| c.matches(page)),
            Predicate::ReadLevel { level } => page.current().permissions().read == *level,
            Predicate::EditedBy { user_id } => is_editor(*user_id, page.revisions().as_slice()),
            Predicate::Exists { field, exists } => {
                let present = match field {
                    ExistsField::Trashed => page.trashed().is_some(),
                    ExistsField::Revision(position) => *position < page.revision_count(),
                };
                present == *exists
            }
            Predicate::Range {
                field,
                lower,
                upper,
            } => {
                let value = match field {
                    TimeField::Created => page.created(),
                    TimeField::Updated => page.updated(),
                };
                lower.map_or(true, |l| value >= l) && upper.map_or(true, |u| value <= u)
            }
            Predicate::Text {
                query,
                case_sensitive,
                diacritic_sensitive,
            } => {
                let content = page.current().content();
                let haystack = fold(
                    &format!("{} {} {}", content.title(), content.path(), content.body()),
                    *case_sensitive,
                    *diacritic_sensitive,
                );
                let needle = fold(query, *case_sensitive, *diacritic_sensitive);
                needle
                    .split_whitespace()
                    .all(|term| haystack.contains(term))
            }
        }
    }
}

fn fold(text: &str, case_sensitive: bool, diacritic_sensitive: bool) -> String {
    let text = if diacritic_sensitive {
        text.to_string()
    } else {
        fold_diacritics(text)
    };
    if case_sensitive {
        text
    } else {
        text.to_lowercase()
    }
}

// ---------------------------------------------------------------------------
// Search criteria
// ---------------------------------------------------------------------------

/// Search parameters as received from a query string. Nothing here is
/// trusted until [`SearchCriteria::from_params`] accepts it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub trashed: Option<bool>,
    pub min_revisions: Option<i64>,
    pub max_revisions: Option<i64>,
    pub created_before: Option<String>,
    pub created_after: Option<String>,
    pub updated_before: Option<String>,
    pub updated_after: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Inclusive bounds on the number of revisions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RevisionBounds {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

/// `before` is an inclusive upper bound, `after` an inclusive lower bound.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeBounds {
    pub before: Option<Timestamp>,
    pub after: Option<Timestamp>,
}

/// Validated search criteria. The compiler trusts every field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchCriteria {
    pub text: Option<String>,
    /// Admins only: search the trash instead of live pages.
    pub trashed: bool,
    pub revisions: RevisionBounds,
    pub created: TimeBounds,
    pub updated: TimeBounds,
}

impl SearchCriteria {
    pub fn from_params(params: &SearchParams) -> Result<Self, CoreError> {
        let text = params
            .q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_string);

        let revisions = RevisionBounds {
            min: parse_count("min_revisions", params.min_revisions)?,
            max: parse_count("max_revisions", params.max_revisions)?,
        };
        if let (Some(min), Some(max)) = (revisions.min, revisions.max) {
            if min > max {
                return Err(CoreError::Validation(format!(
                    "min_revisions ({min}) must not exceed max_revisions ({max})"
                )));
            }
        }

        let created = parse_bounds(
            ("created_before", params.created_before.as_deref()),
            ("created_after", params.created_after.as_deref()),
        )?;
        let updated = parse_bounds(
            ("updated_before", params.updated_before.as_deref()),
            ("updated_after", params.updated_after.as_deref()),
        )?;

        Ok(Self {
            text,
            trashed: params.trashed.unwrap_or(false),
            revisions,
            created,
            updated,
        })
    }
}

fn parse_count(name: &str, value: Option<i64>) -> Result<Option<usize>, CoreError> {
    match value {
        None => Ok(None),
        Some(v) => usize::try_from(v)
            .map(Some)
            .map_err(|_| CoreError::Validation(format!("{name} must not be negative, got {v}"))),
    }
}

fn parse_bounds(
    before: (&str, Option<&str>),
    after: (&str, Option<&str>),
) -> Result<TimeBounds, CoreError> {
    let bounds = TimeBounds {
        before: before.1.map(|raw| parse_timestamp(before.0, raw)).transpose()?,
        after: after.1.map(|raw| parse_timestamp(after.0, raw)).transpose()?,
    };
    if let (Some(b), Some(a)) = (bounds.before, bounds.after) {
        if a > b {
            return Err(CoreError::Validation(format!(
                "{} must not be later than {}",
                after.0, before.0
            )));
        }
    }
    Ok(bounds)
}

/// Accepts RFC 3339 timestamps or bare `YYYY-MM-DD` dates (midnight UTC).
fn parse_timestamp(name: &str, raw: &str) -> Result<Timestamp, CoreError> {
    let raw = raw.trim();
    if let Ok(ts) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&chrono::Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|d| d.and_time(NaiveTime::MIN).and_utc())
        .map_err(|_| {
            CoreError::Validation(format!(
                "{name} must be an RFC 3339 timestamp or YYYY-MM-DD date, got '{raw}'"
            ))
        })
}

// ---------------------------------------------------------------------------
// Subqueries
// ---------------------------------------------------------------------------

/// Which pages the searcher may see at all. `None` for admins.
pub fn permission_clause(searcher: Option<&User>) -> Option<Predicate> {
    let anyone = Predicate::ReadLevel {
        level: PermissionLevel::Anyone,
    };
    match searcher {
        Some(user) if user.is_admin => None,
        None => Some(anyone),
        Some(user) => Some(Predicate::Or {
            clauses: vec![
                anyone,
                Predicate::ReadLevel {
                    level: PermissionLevel::Authenticated,
                },
                Predicate::And {
                    clauses: vec![
                        Predicate::ReadLevel {
                            level: PermissionLevel::Editor,
                        },
                        Predicate::EditedBy { user_id: user.id },
                    ],
                },
            ],
        }),
    }
}

/// Live pages, or (admins asking for it) trashed pages.
pub fn trashed_clause(searcher: Option<&User>, want_trashed: bool) -> Option<Predicate> {
    let is_admin = searcher.is_some_and(|u| u.is_admin);
    Some(Predicate::Exists {
        field: ExistsField::Trashed,
        exists: is_admin && want_trashed,
    })
}

/// `max` becomes "no revision at position `max`", `min` becomes "a revision
/// at position `min - 1`".
pub fn revision_count_clause(bounds: &RevisionBounds) -> Option<Predicate> {
    let upper = bounds.max.map(|max| Predicate::Exists {
        field: ExistsField::Revision(max),
        exists: false,
    });
    let lower = bounds.min.filter(|min| *min > 0).map(|min| Predicate::Exists {
        field: ExistsField::Revision(min - 1),
        exists: true,
    });
    match (upper, lower) {
        (None, None) => None,
        (Some(p), None) | (None, Some(p)) => Some(p),
        (Some(u), Some(l)) => Some(Predicate::And {
            clauses: vec![u, l],
        }),
    }
}

/// Case- and diacritic-insensitive full-text match.
pub fn text_clause(text: Option<&str>) -> Option<Predicate> {
    text.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| Predicate::Text {
            query: t.to_string(),
            case_sensitive: false,
            diacritic_sensitive: false,
        })
}

/// `before` maps to `<=`, `after` maps to `>=`.
pub fn time_clause(field: TimeField, bounds: &TimeBounds) -> Option<Predicate> {
    if bounds.before.is_none() && bounds.after.is_none() {
        return None;
    }
    Some(Predicate::Range {
        field,
        lower: bounds.after,
        upper: bounds.before,
    })
}

/// Compile the full filter for a search.
pub fn compile(searcher: Option<&User>, criteria: &SearchCriteria) -> Predicate {
    Predicate::all_of([
        permission_clause(searcher),
        trashed_clause(searcher, criteria.trashed),
        revision_count_clause(&criteria.revisions),
        text_clause(criteria.text.as_deref()),
        time_clause(TimeField::Created, &criteria.created),
        time_clause(TimeField::Updated, &criteria.updated),
    ])
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
