use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;

use crate::application::CreditService;
use crate::domain::{
    Consumption, CreditType, Entity, EntityId, TicketId, Voucher, format_quantity,
};

/// Full dump of the credit data
#[derive(Debug, Clone, Serialize)]
pub struct CreditSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub entities: Vec<Entity>,
    pub credit_types: Vec<CreditType>,
    pub vouchers: Vec<Voucher>,
    pub consumptions: Vec<Consumption>,
}

/// Exporter for writing credit data as CSV or JSON
pub struct Exporter<'a> {
    service: &'a CreditService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a CreditService) -> Self {
        Self { service }
    }

    /// Export the balance report of a ticket to CSV format
    pub async fn export_report_csv<W: Write>(&self, ticket_id: TicketId, writer: W) -> Result<usize> {
        let lines = self.service.report(ticket_id).await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["voucher_id", "voucher", "consumed_on_ticket", "remaining"])?;

        for line in &lines {
            csv_writer.write_record([
                line.voucher_id.to_string(),
                line.voucher_name.clone(),
                format_quantity(line.consumed_on_ticket),
                format_quantity(line.remaining),
            ])?;
        }

        csv_writer.flush()?;
        Ok(lines.len())
    }

    /// Export voucher balances to CSV format, for one entity or all of them
    pub async fn export_balances_csv<W: Write>(
        &self,
        entity_id: Option<EntityId>,
        writer: W,
    ) -> Result<usize> {
        let entities = match entity_id {
            Some(id) => vec![self.service.get_entity(id).await?],
            None => self.service.list_entities().await?,
        };
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "entity",
            "voucher",
            "active",
            "quantity",
            "consumed",
            "remaining",
            "end_date",
        ])?;

        let mut count = 0;
        for entity in &entities {
            for balance in self.service.entity_balances(entity.id, true).await? {
                csv_writer.write_record([
                    entity.name.clone(),
                    balance.voucher.name.clone(),
                    balance.voucher.is_active.to_string(),
                    format_quantity(balance.voucher.quantity),
                    format_quantity(balance.consumed),
                    format_quantity(balance.remaining),
                    balance
                        .voucher
                        .end_date
                        .map(|d| d.format("%Y-%m-%d").to_string())
                        .unwrap_or_default(),
                ])?;
                count += 1;
            }
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export every consumption to CSV format
    pub async fn export_consumptions_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let vouchers = self.service.list_vouchers(None, true).await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["id", "date", "entity_id", "ticket_id", "voucher", "consumed"])?;

        let mut count = 0;
        for voucher in &vouchers {
            for consumption in self.service.list_consumptions_for_voucher(voucher.id).await? {
                csv_writer.write_record([
                    consumption.id.to_string(),
                    consumption.created_at.to_rfc3339(),
                    voucher.entity_id.to_string(),
                    consumption.ticket_id.to_string(),
                    voucher.name.clone(),
                    format_quantity(consumption.consumed),
                ])?;
                count += 1;
            }
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export everything as a JSON snapshot
    pub async fn export_full_json<W: Write>(&self, mut writer: W) -> Result<CreditSnapshot> {
        let entities = self.service.list_entities().await?;
        let credit_types = self.service.list_credit_types().await?;
        let vouchers = self.service.list_vouchers(None, true).await?;

        let mut consumptions = Vec::new();
        for voucher in &vouchers {
            consumptions.extend(self.service.list_consumptions_for_voucher(voucher.id).await?);
        }
        consumptions.sort_by_key(|c| c.id);

        let snapshot = CreditSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            entities,
            credit_types,
            vouchers,
            consumptions,
        };

        serde_json::to_writer_pretty(&mut writer, &snapshot)?;
        writer.flush()?;

        Ok(snapshot)
    }
}
