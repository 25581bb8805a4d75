// storefront/src/model/mod.rs

pub mod order;
pub mod product;
pub mod status;
pub mod user;

pub use order::{
  AdminBlock, LineItem, NewOrder, Order, Payment, PaymentMethod, PaymentStatus, ShippingKind, ShippingSelection,
  Timeline, TimelineEntry, Totals,
};
pub use product::Product;
pub use status::OrderStatus;
pub use user::UserProfile;
