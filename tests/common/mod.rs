// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use credit::application::CreditService;
use credit::domain::{Entity, NewVoucher, Quantity, Ticket, Voucher};
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(CreditService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = CreditService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Helper to parse a date string into DateTime<Utc>
pub fn parse_date(date_str: &str) -> DateTime<Utc> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc()
}

/// Test fixture: two entities, each with one open ticket
pub struct Helpdesk {
    pub acme: Entity,
    pub globex: Entity,
    pub acme_ticket: Ticket,
    pub acme_other_ticket: Ticket,
    pub globex_ticket: Ticket,
}

impl Helpdesk {
    pub async fn create(service: &CreditService) -> Result<Self> {
        let acme = service.create_entity("Acme").await?;
        let globex = service.create_entity("Globex").await?;
        let acme_ticket = service.create_ticket(acme.id, "Printer on fire").await?;
        let acme_other_ticket = service.create_ticket(acme.id, "VPN down").await?;
        let globex_ticket = service.create_ticket(globex.id, "Password reset").await?;
        Ok(Self {
            acme,
            globex,
            acme_ticket,
            acme_other_ticket,
            globex_ticket,
        })
    }
}

/// Create an active, undated voucher
pub async fn voucher(
    service: &CreditService,
    entity: &Entity,
    name: &str,
    quantity: Quantity,
) -> Result<Voucher> {
    Ok(service
        .create_voucher(NewVoucher::new(entity.id, name, quantity))
        .await?)
}
