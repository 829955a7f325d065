use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{EntityId, Quantity, TicketId, Voucher, VoucherId};

/// Credit left on one voucher, seen from a ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceLine {
    pub voucher_id: VoucherId,
    pub voucher_name: String,
    /// Consumed by the ticket the report was built for
    pub consumed_on_ticket: Quantity,
    /// Granted quantity minus everything consumed by any ticket
    pub remaining: Quantity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketReport {
    pub ticket_id: TicketId,
    pub entity_id: EntityId,
    pub generated_at: DateTime<Utc>,
    pub lines: Vec<BalanceLine>,
}

/// Voucher with its consumption summed over every ticket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoucherBalance {
    pub voucher: Voucher,
    pub consumed: Quantity,
    pub remaining: Quantity,
}

/// Vouchers deactivated by one run of the expiration task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CronRun {
    pub task: String,
    pub ran_at: DateTime<Utc>,
    pub expired: Vec<Voucher>,
}
