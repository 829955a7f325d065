// Application layer - use cases on top of the repository.

pub mod error;
pub mod notification;
mod reporter;
pub mod reporting;
mod search;
mod service;

pub use error::*;
pub use notification::{NotificationData, add_credit_data};
pub use reporter::*;
pub use reporting::*;
pub use search::*;
pub use service::*;
