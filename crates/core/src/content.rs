//! Page content value object, slug generation, and text folding.

use serde::{Deserialize, Serialize};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::error::CoreError;

/// Maximum title length in characters.
pub const MAX_TITLE_LEN: usize = 200;

/// Maximum body length in characters.
pub const MAX_BODY_LEN: usize = 100_000;

// ---------------------------------------------------------------------------
// Content
// ---------------------------------------------------------------------------

/// The title, URL path, and body of one revision.
///
/// A constructed `Content` always has a valid path: either the caller's, or
/// one derived from the title with [`slugify`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ContentFields")]
pub struct Content {
    title: String,
    path: String,
    body: String,
}

/// Wire shape of [`Content`]; deserialization always goes through
/// [`Content::new`].
#[derive(Deserialize)]
struct ContentFields {
    title: String,
    path: Option<String>,
    #[serde(default)]
    body: String,
}

impl TryFrom<ContentFields> for Content {
    type Error = CoreError;

    fn try_from(fields: ContentFields) -> Result<Self, Self::Error> {
        Content::new(fields.title, fields.path, fields.body)
    }
}

impl Content {
    /// Validate and build content. A `None` path is derived from the title.
    pub fn new(
        title: impl Into<String>,
        path: Option<String>,
        body: impl Into<String>,
    ) -> Result<Self, CoreError> {
        let title = title.into();
        let body = body.into();
        validate_title(&title)?;
        validate_body(&body)?;

        let path = match path {
            Some(p) => {
                validate_path(&p)?;
                p
            }
            None => {
                let derived = slugify(&title);
                if derived.is_empty() {
                    return Err(CoreError::Validation(format!(
                        "Cannot derive a path from title '{title}'; supply one explicitly"
                    )));
                }
                derived
            }
        };

        Ok(Self { title, path, body })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn body(&self) -> &str {
        &self.body
    }
}

// ---------------------------------------------------------------------------
// Slug generation
// ---------------------------------------------------------------------------

/// Generate a URL-safe path from a page title.
///
/// Folds diacritics, lowercases, replaces every non-alphanumeric character
/// with a hyphen, collapses consecutive hyphens, and trims leading/trailing
/// hyphens. Titles with no ASCII letters or digits yield an empty string.
pub fn slugify(title: &str) -> String {
    let folded = fold_diacritics(title).to_lowercase();

    let mut result = String::with_capacity(folded.len());
    let mut prev_hyphen = false;
    for c in folded.chars() {
        if c.is_ascii_alphanumeric() {
            result.push(c);
            prev_hyphen = false;
        } else if !prev_hyphen {
            result.push('-');
            prev_hyphen = true;
        }
    }

    result.trim_matches('-').to_string()
}

/// Strip combining marks after canonical decomposition (`é` becomes `e`).
pub fn fold_diacritics(text: &str) -> String {
    text.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a page title (non-empty, <= 200 chars).
pub fn validate_title(title: &str) -> Result<(), CoreError> {
    if title.trim().is_empty() {
        return Err(CoreError::Validation("Title must not be empty".into()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(CoreError::Validation(format!(
            "Title must be at most {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(())
}

/// Validate a page path (non-empty, lowercase alphanumeric runs joined by
/// single hyphens).
pub fn validate_path(path: &str) -> Result<(), CoreError> {
    if path.is_empty() {
        return Err(CoreError::Validation("Path must not be empty".into()));
    }
    let well_formed = path.split('-').all(|part| {
        !part.is_empty()
            && part
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
    });
    if !well_formed {
        return Err(CoreError::Validation(format!(
            "Path '{path}' must contain only lowercase alphanumeric characters separated by single hyphens"
        )));
    }
    Ok(())
}

/// Validate a page body (max 100 000 chars).
pub fn validate_body(body: &str) -> Result<(), CoreError> {
    if body.chars().count() > MAX_BODY_LEN {
        return Err(CoreError::Validation(format!(
            "Body must be at most {MAX_BODY_LEN} characters"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- slugify -------------------------------------------------------------

    #[test]
    fn slug_basic_title() {
        assert_eq!(slugify("Getting Started"), "getting-started");
    }

    #[test]
    fn slug_special_characters() {
        assert_eq!(slugify("How to: Edit Pages (v2)"), "how-to-edit-pages-v2");
    }

    #[test]
    fn slug_folds_diacritics() {
        assert_eq!(slugify("Crème Brûlée à la carte"), "creme-brulee-a-la-carte");
    }

    #[test]
    fn slug_collapses_and_trims_hyphens() {
        assert_eq!(slugify("--foo---bar--"), "foo-bar");
    }

    #[test]
    fn slug_of_punctuation_is_empty() {
        assert_eq!(slugify("?!"), "");
    }

    // -- Content::new --------------------------------------------------------

    #[test]
    fn content_derives_path_from_title() {
        let content = Content::new("Release Notes", None, "").unwrap();
        assert_eq!(content.path(), "release-notes");
        assert_eq!(content.title(), "Release Notes");
    }

    #[test]
    fn content_keeps_supplied_path() {
        let content = Content::new("Release Notes", Some("notes-2024".into()), "b").unwrap();
        assert_eq!(content.path(), "notes-2024");
        assert_eq!(content.body(), "b");
    }

    #[test]
    fn content_rejects_malformed_path() {
        assert!(Content::new("T", Some("Bad Path".into()), "").is_err());
        assert!(Content::new("T", Some("a--b".into()), "").is_err());
        assert!(Content::new("T", Some("-a".into()), "").is_err());
        assert!(Content::new("T", Some(String::new()), "").is_err());
    }

    #[test]
    fn content_rejects_underivable_path() {
        assert!(Content::new("???", None, "").is_err());
    }

    #[test]
    fn content_deserializes_through_validation() {
        let content: Content =
            serde_json::from_str(r#"{"title": "Hello World", "body": "hi"}"#).unwrap();
        assert_eq!(content.path(), "hello-world");

        let bad: Result<Content, _> = serde_json::from_str(r#"{"title": "", "body": ""}"#);
        assert!(bad.is_err());
    }

    // -- validate_title / validate_body --------------------------------------

    #[test]
    fn title_empty_rejected() {
        assert!(validate_title("").is_err());
        assert!(validate_title("   ").is_err());
    }

    #[test]
    fn title_too_long_rejected() {
        assert!(validate_title(&"a".repeat(201)).is_err());
        assert!(validate_title(&"a".repeat(200)).is_ok());
    }

    #[test]
    fn body_too_long_rejected() {
        assert!(validate_body(&"x".repeat(100_001)).is_err());
        assert!(validate_body("Hello world").is_ok());
    }

    // -- fold_diacritics -----------------------------------------------------

    #[test]
    fn fold_keeps_base_letters() {
        assert_eq!(fold_diacritics("Ångström naïve"), "Angstrom naive");
    }
}
