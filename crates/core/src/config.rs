use crate::error::CoreError;
use crate::permission::PermissionLevel;

/// Default number of pages per listing window.
pub const DEFAULT_PAGE_LIMIT: i64 = 20;

/// Upper bound on any requested listing window.
pub const MAX_PAGE_LIMIT: i64 = 100;

/// Deployment-wide wiki settings.
///
/// Built once at startup and passed by reference into
/// [`PermissionPolicy::new`](crate::permission::PermissionPolicy::new) and
/// [`Paginator::new`](crate::pagination::Paginator::new); nothing in the core
/// reads the environment on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikiConfig {
    /// Read level for new pages that do not specify one (default: `anyone`).
    pub default_read: PermissionLevel,
    /// Write level for new pages that do not specify one (default: `editor`).
    pub default_write: PermissionLevel,
    /// Window size when the caller omits `limit` (default: `20`).
    pub default_page_limit: i64,
    /// Largest window a caller may request (default: `100`).
    pub max_page_limit: i64,
}

impl Default for WikiConfig {
    fn default() -> Self {
        Self {
            default_read: PermissionLevel::Anyone,
            default_write: PermissionLevel::Editor,
            default_page_limit: DEFAULT_PAGE_LIMIT,
            max_page_limit: MAX_PAGE_LIMIT,
        }
    }
}

impl WikiConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var               | Default  |
    /// |-----------------------|----------|
    /// | `WIKI_DEFAULT_READ`   | `anyone` |
    /// | `WIKI_DEFAULT_WRITE`  | `editor` |
    /// | `WIKI_PAGE_LIMIT`     | `20`     |
    /// | `WIKI_MAX_PAGE_LIMIT` | `100`    |
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reads through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CoreError> {
        let defaults = Self::default();

        let default_read = match lookup("WIKI_DEFAULT_READ") {
            Some(v) => v.trim().parse()?,
            None => defaults.default_read,
        };
        let default_write = match lookup("WIKI_DEFAULT_WRITE") {
            Some(v) => v.trim().parse()?,
            None => defaults.default_write,
        };
        let default_page_limit = match lookup("WIKI_PAGE_LIMIT") {
            Some(v) => parse_limit("WIKI_PAGE_LIMIT", &v)?,
            None => defaults.default_page_limit,
        };
        let max_page_limit = match lookup("WIKI_MAX_PAGE_LIMIT") {
            Some(v) => parse_limit("WIKI_MAX_PAGE_LIMIT", &v)?,
            None => defaults.max_page_limit,
        };

        let config = Self {
            default_read,
            default_write,
            default_page_limit,
            max_page_limit,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.default_page_limit < 1 || self.max_page_limit < 1 {
            return Err(CoreError::Validation(
                "Page limits must be positive".into(),
            ));
        }
        if self.default_page_limit > self.max_page_limit {
            return Err(CoreError::Validation(format!(
                "Default page limit {} exceeds maximum {}",
                self.default_page_limit, self.max_page_limit
            )));
        }
        Ok(())
    }
}

fn parse_limit(key: &str, raw: &str) -> Result<i64, CoreError> {
    raw.trim()
        .parse()
        .map_err(|_| CoreError::Validation(format!("{key} must be an integer, got '{raw}'")))
}
