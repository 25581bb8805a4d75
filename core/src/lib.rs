// storefront/src/lib.rs

//! Storefront: cart reconciliation, order lifecycle and tournament results over a
//! path-addressed realtime document store.
//!
//! The crate provides:
//!  - A `DocumentStore` abstraction with atomic batches, single-path transactions and
//!    origin-tagged realtime subscriptions, plus an in-memory implementation.
//!  - A cart reconciler that merges a device cart into the signed-in user's remote cart
//!    and follows remote changes without echoing its own writes.
//!  - An order lifecycle manager with an explicit status transition table.
//!  - A checkout session and an order-placement saga with compensations.
//!  - A tournament result resolver (rounds, podiums, event summaries).
//!  - A one-time migration from slug-keyed to uid-keyed storage.

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod error;
pub mod identity;
pub mod migration;
pub mod model;
pub mod money;
pub mod orders;
pub mod saga;
pub mod store;
pub mod tournament;

// --- Re-exports for the Public API ---

// Store
pub use crate::store::{
  paths, ChangeEvent, DocPath, DocumentStore, MemoryStore, Origin, SharedStore, Subscription, WriteBatch,
};

// Errors
pub use crate::error::{AuthError, ShopError, ShopResult, StockViolation, ViolationReason};

// Domain types
pub use crate::identity::{AuthState, Identity, IdentityProvider};
pub use crate::model::{
  LineItem, NewOrder, Order, OrderStatus, PaymentMethod, PaymentStatus, ShippingKind, ShippingSelection,
};
pub use crate::money::Money;

// Components
pub use crate::cart::{merge_carts, CartBinding, CartMap, CartReconciler, CartSync, LocalCart};
pub use crate::catalog::{CartLine, CatalogItem, CatalogReader};
pub use crate::checkout::{CheckoutSession, CheckoutSettings, OrderPlacement, PaymentSubmission, PlacedOrder};
pub use crate::migration::{MigrationReport, Migrator};
pub use crate::orders::{OrderId, OrderManager, OrderQuery, OrderRecord, OrderStatistics};
pub use crate::saga::{Saga, SagaContext};
pub use crate::tournament::{EventListing, EventResolver, EventResults, Podium, UserDirectory};

/*
    Typical flow:
    1. Build a `SharedStore` (e.g. `Arc::new(MemoryStore::new())`).
    2. Follow the signed-in identity with `CartSync::follow(auth_state.subscribe())`.
    3. Join the bound cart against the catalog (`CartBinding::lines`), stage a selection
       and a review on a `CheckoutSession`.
    4. Call `OrderPlacement::place`; on a late failure the saga restocks and cancels.
    5. Admin tooling drives the order through `OrderManager` using the transition table.
*/
