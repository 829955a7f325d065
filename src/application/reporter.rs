use tracing::{debug, instrument};

use crate::domain::TicketId;
use crate::storage::{CreditStore, TicketStore};

use super::{AppError, BalanceLine};

/// Computes, for a ticket, what is left on every active voucher of the
/// ticket's entity. Read-only; the stores are passed in rather than owned.
pub struct BalanceReporter<'a, T, C> {
    tickets: &'a T,
    credits: &'a C,
}

impl<'a, T, C> BalanceReporter<'a, T, C>
where
    T: TicketStore + Sync,
    C: CreditStore + Sync,
{
    pub fn new(tickets: &'a T, credits: &'a C) -> Self {
        Self { tickets, credits }
    }

    /// One line per active voucher of the ticket's entity, ordered by voucher name.
    ///
    /// `remaining` is the granted quantity minus consumption by all tickets and
    /// is not clamped at zero. Fails with `TicketNotFound` for an unknown ticket.
    #[instrument(skip(self))]
    pub async fn report(&self, ticket_id: TicketId) -> Result<Vec<BalanceLine>, AppError> {
        let ticket = self
            .tickets
            .get_ticket(ticket_id)
            .await?
            .ok_or(AppError::TicketNotFound(ticket_id))?;

        let vouchers = self
            .credits
            .active_vouchers_for_entity(ticket.entity_id)
            .await?;
        if vouchers.is_empty() {
            debug!(entity_id = ticket.entity_id, "no active vouchers");
            return Ok(Vec::new());
        }

        let totals = self
            .credits
            .consumption_totals(ticket.entity_id, ticket_id)
            .await?;

        Ok(vouchers
            .into_iter()
            .map(|voucher| {
                let sums = totals.get(&voucher.id).copied().unwrap_or_default();
                BalanceLine {
                    voucher_id: voucher.id,
                    remaining: voucher.remaining(sums.total),
                    voucher_name: voucher.name,
                    consumed_on_ticket: sums.on_ticket,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use anyhow::Result;
    use chrono::Utc;

    use super::*;
    use crate::domain::{
        Consumption, EntityId, NewVoucher, Quantity, Ticket, Voucher, VoucherId,
    };
    use crate::storage::ConsumptionTotals;

    /// In-memory stand-in for the ticket and credit tables.
    #[derive(Default)]
    struct MemoryStore {
        tickets: Vec<Ticket>,
        vouchers: Vec<Voucher>,
        consumptions: Vec<Consumption>,
        fail: bool,
    }

    impl MemoryStore {
        fn ticket(&mut self, id: i64, entity_id: EntityId) {
            self.tickets.push(Ticket {
                id,
                entity_id,
                name: format!("T{}", id),
                created_at: Utc::now(),
            });
        }

        fn voucher(&mut self, id: VoucherId, entity_id: EntityId, name: &str, quantity: Quantity, active: bool) {
            let mut new = NewVoucher::new(entity_id, name, quantity);
            if !active {
                new = new.inactive();
            }
            self.vouchers.push(new.into_voucher(id, Utc::now()));
        }

        fn consume(&mut self, voucher_id: VoucherId, ticket_id: i64, consumed: Quantity) {
            self.consumptions.push(Consumption {
                id: self.consumptions.len() as i64 + 1,
                voucher_id,
                ticket_id,
                consumed,
                created_at: Utc::now(),
            });
        }
    }

    impl TicketStore for MemoryStore {
        async fn get_ticket(&self, id: TicketId) -> Result<Option<Ticket>> {
            if self.fail {
                anyhow::bail!("store offline");
            }
            Ok(self.tickets.iter().find(|t| t.id == id).cloned())
        }
    }

    impl CreditStore for MemoryStore {
        async fn active_vouchers_for_entity(&self, entity_id: EntityId) -> Result<Vec<Voucher>> {
            let mut vouchers: Vec<Voucher> = self
                .vouchers
                .iter()
                .filter(|v| v.is_active && v.entity_id == entity_id)
                .cloned()
                .collect();
            vouchers.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(vouchers)
        }

        async fn consumption_totals(
            &self,
            entity_id: EntityId,
            ticket_id: TicketId,
        ) -> Result<HashMap<VoucherId, ConsumptionTotals>> {
            let mut totals: HashMap<VoucherId, ConsumptionTotals> = HashMap::new();
            for c in &self.consumptions {
                let owned = self
                    .vouchers
                    .iter()
                    .any(|v| v.id == c.voucher_id && v.entity_id == entity_id);
                if !owned {
                    continue;
                }
                let entry = totals.entry(c.voucher_id).or_default();
                entry.total += c.consumed;
                if c.ticket_id == ticket_id {
                    entry.on_ticket += c.consumed;
                }
            }
            Ok(totals)
        }
    }

    fn line(id: VoucherId, name: &str, consumed: Quantity, remaining: Quantity) -> BalanceLine {
        BalanceLine {
            voucher_id: id,
            voucher_name: name.to_string(),
            consumed_on_ticket: consumed,
            remaining,
        }
    }

    #[tokio::test]
    async fn test_consumption_by_other_tickets_reduces_remaining_only() -> Result<()> {
        let mut store = MemoryStore::default();
        store.ticket(1, 10);
        store.ticket(2, 10);
        store.voucher(1, 10, "V1", 10000, true);
        store.consume(1, 1, 1000);
        store.consume(1, 2, 500);

        let reporter = BalanceReporter::new(&store, &store);
        assert_eq!(reporter.report(1).await?, vec![line(1, "V1", 1000, 8500)]);
        assert_eq!(reporter.report(2).await?, vec![line(1, "V1", 500, 8500)]);
        Ok(())
    }

    #[tokio::test]
    async fn test_only_active_vouchers_of_the_ticket_entity() -> Result<()> {
        let mut store = MemoryStore::default();
        store.ticket(1, 10);
        store.voucher(1, 10, "Active", 1000, true);
        store.voucher(2, 10, "Inactive", 1000, false);
        store.voucher(3, 20, "Other entity", 1000, true);

        let lines = BalanceReporter::new(&store, &store).report(1).await?;
        assert_eq!(lines, vec![line(1, "Active", 0, 1000)]);
        Ok(())
    }

    #[tokio::test]
    async fn test_over_consumption_is_not_clamped() -> Result<()> {
        let mut store = MemoryStore::default();
        store.ticket(1, 10);
        store.voucher(1, 10, "Small", 100, true);
        store.consume(1, 1, 250);

        let lines = BalanceReporter::new(&store, &store).report(1).await?;
        assert_eq!(lines, vec![line(1, "Small", 250, -150)]);
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_ticket_is_an_error() {
        let store = MemoryStore::default();
        let result = BalanceReporter::new(&store, &store).report(42).await;
        assert!(matches!(result, Err(AppError::TicketNotFound(42))));
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let store = MemoryStore {
            fail: true,
            ..Default::default()
        };
        let result = BalanceReporter::new(&store, &store).report(1).await;
        assert!(matches!(result, Err(AppError::Database(_))));
    }
}
