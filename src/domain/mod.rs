mod consumption;
mod credit_type;
mod cron;
mod quantity;
mod search;
mod ticket;
mod voucher;

pub use consumption::*;
pub use credit_type::*;
pub use cron::*;
pub use quantity::*;
pub use search::*;
pub use ticket::*;
pub use voucher::*;

/// Table names shared by the schema, the repository and the search columns.
pub mod tables {
    pub const ENTITIES: &str = "entities";
    pub const TICKETS: &str = "tickets";
    pub const CREDIT_TYPES: &str = "credit_types";
    pub const VOUCHERS: &str = "credit_entities";
    pub const CONSUMPTIONS: &str = "credit_tickets";
}
