// storefront/src/saga/mod.rs

//! A small saga runner: ordered named steps sharing a [`SagaContext`], each with an
//! optional compensation that runs, in reverse order, when a later required step fails.

pub mod context;
pub mod definition;
pub mod execution;
pub mod step;

pub use context::SagaContext;
pub use definition::{Compensation, Saga, StepHandler};
pub use step::{SkipCondition, StepDef};
