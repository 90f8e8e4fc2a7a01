/// Remote primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// Client-generated shot handle. Never reused.
pub type LocalId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
