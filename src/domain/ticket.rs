use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type EntityId = i64;
pub type TicketId = i64;

/// Organizational unit owning tickets and vouchers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
}

/// Support request. Only its owning entity matters for credit accounting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    pub entity_id: EntityId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}
