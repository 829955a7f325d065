mod repository;
mod stores;

pub use repository::*;
pub use stores::*;

/// Host schema: entities, tickets and the scheduled task table
pub const MIGRATION_001_HOST: &str = include_str!("migrations/001_host.sql");

/// Credit type dropdown
pub const MIGRATION_002_CREDIT_TYPES: &str = include_str!("migrations/002_credit_types.sql");

/// Vouchers
pub const MIGRATION_003_VOUCHERS: &str = include_str!("migrations/003_credit_entities.sql");

/// Consumptions
pub const MIGRATION_004_CONSUMPTIONS: &str = include_str!("migrations/004_credit_tickets.sql");
