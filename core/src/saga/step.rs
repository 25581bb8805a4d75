// storefront/src/saga/step.rs

use super::SagaContext;

/// Evaluated before a step runs; `true` skips it.
pub type SkipCondition<T> = std::sync::Arc<dyn Fn(SagaContext<T>) -> bool + Send + Sync + 'static>;

#[derive(Clone)]
pub struct StepDef<T: 'static + Send + Sync> {
  pub name: String,
  /// Failures of an optional step are logged and the saga carries on.
  pub optional: bool,
  pub skip_if: Option<SkipCondition<T>>,
}
