/// User identifiers are PostgreSQL BIGSERIAL keys owned by the auth layer.
pub type DbId = i64;

/// Pages are addressed by time-ordered UUIDs (v7).
pub type PageId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
