use std::collections::HashMap;
use std::future::Future;

use anyhow::Result;

use crate::domain::{EntityId, Quantity, Ticket, TicketId, Voucher, VoucherId};

/// Lookup of tickets owned by the host.
pub trait TicketStore {
    /// Returns `None` when the id does not resolve to a ticket.
    fn get_ticket(&self, id: TicketId) -> impl Future<Output = Result<Option<Ticket>>> + Send;
}

/// Per-voucher consumption sums.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumptionTotals {
    /// Consumed by the ticket the totals were requested for
    pub on_ticket: Quantity,
    /// Consumed by every ticket
    pub total: Quantity,
}

/// Set-based reads over vouchers and their consumptions.
pub trait CreditStore {
    /// Active vouchers owned by `entity_id`, ordered by name.
    fn active_vouchers_for_entity(
        &self,
        entity_id: EntityId,
    ) -> impl Future<Output = Result<Vec<Voucher>>> + Send;

    /// Consumption sums for every voucher of `entity_id` that has at least one
    /// consumption. Vouchers absent from the map have consumed nothing.
    fn consumption_totals(
        &self,
        entity_id: EntityId,
        ticket_id: TicketId,
    ) -> impl Future<Output = Result<HashMap<VoucherId, ConsumptionTotals>>> + Send;
}
