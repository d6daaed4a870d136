//! Render a [`Predicate`] into the `WHERE` clause of a `pages` query.
//!
//! Every value goes through a bind parameter; only column names and SQL
//! keywords are pushed as text.

use folio_core::query::{ExistsField, Predicate, TimeField};
use serde_json::json;
use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder};

/// Current revision (index 0 of the newest-first log).
const CURRENT: &str = "revisions->0";

/// Title, path and body of the current revision as one searchable string.
const SEARCHABLE: &str = "concat_ws(' ', revisions->0->'content'->>'title', \
                          revisions->0->'content'->>'path', \
                          revisions->0->'content'->>'body')";

/// Append `predicate` to `qb` as a boolean SQL expression.
pub fn push_predicate(qb: &mut QueryBuilder<'_, Postgres>, predicate: &Predicate) {
    match predicate {
        Predicate::And { clauses } => push_group(qb, clauses, " AND ", "TRUE"),
        Predicate::Or { clauses } => push_group(qb, clauses, " OR ", "FALSE"),
        Predicate::ReadLevel { level } => {
            qb.push(format!("{CURRENT}->'permissions'->>'read' = "))
                .push_bind(level.as_str());
        }
        Predicate::EditedBy { user_id } => {
            qb.push("revisions @> ")
                .push_bind(Json(json!([{ "editor": user_id }])));
        }
        Predicate::Exists {
            field: ExistsField::Trashed,
            exists,
        } => {
            qb.push(if *exists {
                "trashed_at IS NOT NULL"
            } else {
                "trashed_at IS NULL"
            });
        }
        Predicate::Exists {
            field: ExistsField::Revision(position),
            exists,
        } => {
            let position = i32::try_from(*position).unwrap_or(i32::MAX);
            qb.push(if *exists {
                "jsonb_array_length(revisions) > "
            } else {
                "jsonb_array_length(revisions) <= "
            })
            .push_bind(position);
        }
        Predicate::Range {
            field,
            lower,
            upper,
        } => {
            let column = match field {
                TimeField::Created => "created_at",
                TimeField::Updated => "updated_at",
            };
            match (lower, upper) {
                (None, None) => {
                    qb.push("TRUE");
                }
                (Some(lower), None) => {
                    qb.push(format!("{column} >= ")).push_bind(*lower);
                }
                (None, Some(upper)) => {
                    qb.push(format!("{column} <= ")).push_bind(*upper);
                }
                (Some(lower), Some(upper)) => {
                    qb.push(format!("({column} >= "))
                        .push_bind(*lower)
                        .push(format!(" AND {column} <= "))
                        .push_bind(*upper)
                        .push(")");
                }
            }
        }
        Predicate::Text {
            query,
            case_sensitive,
            diacritic_sensitive,
        } => {
            let terms: Vec<&str> = query.split_whitespace().collect();
            if terms.is_empty() {
                qb.push("TRUE");
                return;
            }
            let (open, close) = folding(*case_sensitive, *diacritic_sensitive);
            qb.push("(");
            for (i, term) in terms.into_iter().enumerate() {
                if i > 0 {
                    qb.push(" AND ");
                }
                qb.push(format!("strpos({open}{SEARCHABLE}{close}, {open}"))
                    .push_bind(term.to_string())
                    .push(format!("{close}) > 0"));
            }
            qb.push(")");
        }
    }
}

fn push_group(
    qb: &mut QueryBuilder<'_, Postgres>,
    clauses: &[Predicate],
    separator: &str,
    empty: &str,
) {
    if clauses.is_empty() {
        qb.push(empty);
        return;
    }
    qb.push("(");
    for (i, clause) in clauses.iter().enumerate() {
        if i > 0 {
            qb.push(separator);
        }
        push_predicate(qb, clause);
    }
    qb.push(")");
}

/// Function wrappers applied to both sides of a text match.
fn folding(case_sensitive: bool, diacritic_sensitive: bool) -> (String, String) {
    let mut open = String::new();
    let mut close = String::new();
    if !case_sensitive {
        open.push_str("lower(");
        close.push(')');
    }
    if !diacritic_sensitive {
        open.push_str("unaccent(");
        close.push(')');
    }
    (open, close)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
