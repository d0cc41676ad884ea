//! Delivery ledger model.

use beacon_core::types::{DbId, LocalTimestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `notification_deliveries` table.
///
/// At most one row exists per (`notification_id`, `user_id`).
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct DeliveryRecord {
    pub id: DbId,
    pub notification_id: DbId,
    pub user_id: String,
    pub delivered_at: LocalTimestamp,
    pub read_at: Option<LocalTimestamp>,
}
