pub mod availability;
pub mod cancellation_policy;
pub mod date_range;
pub mod error;
pub mod handlers;
#[cfg(test)]
pub mod memory_store;
pub mod models;
pub mod notifier;
pub mod price_calculator;
pub mod rate_resolver;
pub mod repository;
pub mod service;
pub mod status_machine;

pub use availability::*;
pub use cancellation_policy::*;
pub use date_range::*;
pub use error::*;
pub use handlers::*;
pub use models::*;
pub use notifier::*;
pub use price_calculator::*;
pub use rate_resolver::*;
pub use repository::*;
pub use service::*;
pub use status_machine::*;
