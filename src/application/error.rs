use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{CreditTypeId, EntityId, Quantity, TicketId, VoucherId, format_quantity};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    #[error("Entity already exists: {0}")]
    EntityAlreadyExists(String),

    #[error("Ticket not found: {0}")]
    TicketNotFound(TicketId),

    #[error("Voucher not found: {0}")]
    VoucherNotFound(VoucherId),

    #[error("Voucher '{name}' already exists in entity {entity_id}")]
    VoucherAlreadyExists { name: String, entity_id: EntityId },

    #[error("Voucher is inactive: {0}")]
    VoucherInactive(String),

    #[error("Voucher '{name}' cannot be consumed on {at} (valid {begin} to {end})", begin = fmt_bound(.begin_date), end = fmt_bound(.end_date))]
    VoucherOutOfPeriod {
        name: String,
        at: DateTime<Utc>,
        begin_date: Option<DateTime<Utc>>,
        end_date: Option<DateTime<Utc>>,
    },

    #[error("Ticket {ticket_id} belongs to entity {ticket_entity}, voucher '{voucher_name}' to entity {voucher_entity}")]
    EntityMismatch {
        ticket_id: TicketId,
        ticket_entity: EntityId,
        voucher_name: String,
        voucher_entity: EntityId,
    },

    #[error("Insufficient credit on voucher {voucher_name}: remaining {}, required {}", format_quantity(*.remaining), format_quantity(*.required))]
    InsufficientCredit {
        voucher_name: String,
        remaining: Quantity,
        required: Quantity,
    },

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("Invalid validity period: end date {end} is before begin date {begin}")]
    InvalidPeriod {
        begin: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("Credit type not found: {0}")]
    CreditTypeNotFound(CreditTypeId),

    #[error("Credit type already exists: {0}")]
    CreditTypeAlreadyExists(String),

    #[error("Unknown cron task: {0}")]
    UnknownCronTask(String),

    #[error("Credit tables are not installed in {0}, run `credit init` first")]
    NotInstalled(String),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

fn fmt_bound(bound: &Option<DateTime<Utc>>) -> String {
    bound
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}
