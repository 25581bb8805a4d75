// storefront/src/orders/mod.rs

//! The order lifecycle: id generation, stock checks, creation, transition-checked
//! updates, admin operations and queries.

pub mod admin;
pub mod id;
pub mod manager;

pub use admin::OrderStatistics;
pub use id::OrderId;
pub use manager::{OrderManager, OrderQuery, OrderRecord, StockChange};
