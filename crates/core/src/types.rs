/// Generation jobs and chapters are identified by UUIDv4.
pub type JobId = uuid::Uuid;

/// Chapters carry their own identity so regeneration records can refer
/// to them independently of the owning job.
pub type ChapterId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
