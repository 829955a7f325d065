use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Quantity, TicketId, VoucherId};

pub type ConsumptionId = i64;

/// A quantity deducted from a voucher on behalf of a ticket.
/// Rows are append-only; a ticket may consume the same voucher several times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consumption {
    pub id: ConsumptionId,
    pub voucher_id: VoucherId,
    pub ticket_id: TicketId,
    /// Amount consumed, in hundredths (always positive)
    pub consumed: Quantity,
    pub created_at: DateTime<Utc>,
}

/// Consumption joined with the name of the voucher it was taken from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumptionDetail {
    #[serde(flatten)]
    pub consumption: Consumption,
    pub voucher_name: String,
}
