pub mod application;
pub mod cli;
pub mod domain;
pub mod io;
pub mod plugin;
pub mod storage;

pub use application::{AppError, CreditService};
pub use domain::*;
pub use storage::Repository;
