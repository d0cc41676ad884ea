/// All notification and token primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// Tenants (customers) are identified by UUID.
pub type TenantId = uuid::Uuid;

/// Wall-clock local time without a zone.
///
/// Every timestamp the notification engine stores or compares uses this
/// representation, produced by a single [`Clock`](crate::clock::Clock), so
/// schedule comparisons never go through a timezone conversion.
pub type LocalTimestamp = chrono::NaiveDateTime;

/// Identifies one holder of a notification's dispatch claim.
pub type ClaimToken = uuid::Uuid;
