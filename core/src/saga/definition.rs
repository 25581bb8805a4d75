// storefront/src/saga/definition.rs

//! `Saga<T>` construction: step definitions, step handlers and compensations.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use super::context::SagaContext;
use super::step::{SkipCondition, StepDef};
use crate::error::{ShopError, ShopResult};

/// Forward action of a step.
pub type StepHandler<T> =
  Box<dyn Fn(SagaContext<T>) -> Pin<Box<dyn Future<Output = ShopResult<()>> + Send>> + Send + Sync>;

/// Undo action of a step. Receives the context as it stood when the saga failed.
pub type Compensation<T> =
  Box<dyn Fn(SagaContext<T>) -> Pin<Box<dyn Future<Output = ShopResult<()>> + Send>> + Send + Sync>;

pub struct Saga<T>
where
  T: 'static + Send + Sync,
{
  pub(crate) name: String,
  pub(crate) steps: Vec<StepDef<T>>,
  pub(crate) handlers: HashMap<String, StepHandler<T>>,
  pub(crate) compensations: HashMap<String, Compensation<T>>,
}

impl<T> Saga<T>
where
  T: 'static + Send + Sync,
{
  pub fn new(name: impl Into<String>, step_defs: &[(&str, bool, Option<SkipCondition<T>>)]) -> Self {
    let steps = step_defs
      .iter()
      .map(|(name, optional, skip_if)| StepDef {
        name: (*name).to_string(),
        optional: *optional,
        skip_if: skip_if.clone(),
      })
      .collect();

    Saga {
      name: name.into(),
      steps,
      handlers: HashMap::new(),
      compensations: HashMap::new(),
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  /// One line per step: `name[?] -> handler / undo`, where `?` marks an optional step and
  /// `-` a missing handler or compensation. Used in startup logs.
  pub fn plan(&self) -> Vec<String> {
    self
      .steps
      .iter()
      .map(|step| {
        let mark = |present: bool, label: &str| if present { label.to_string() } else { "-".to_string() };
        format!(
          "{}{}{} -> {} / {}",
          step.name,
          if step.optional { "?" } else { "" },
          if step.skip_if.is_some() { " (conditional)" } else { "" },
          mark(self.handlers.contains_key(&step.name), "run"),
          mark(self.compensations.contains_key(&step.name), "undo"),
        )
      })
      .collect()
  }

  /// Panics on an unknown step name: that is a wiring mistake, not a runtime condition.
  fn ensure_step_exists(&self, step_name: &str) {
    if !self.steps.iter().any(|s| s.name == step_name) {
      panic!("Saga setup error: step '{}' is not defined in saga '{}'.", step_name, self.name);
    }
  }

  /// Sets the forward action of `step_name`, replacing any previous one.
  pub fn on_step<F, E>(&mut self, step_name: &str, handler_fn: impl Fn(SagaContext<T>) -> F + Send + Sync + 'static)
  where
    F: Future<Output = Result<(), E>> + Send + 'static,
    E: Into<ShopError> + Send + 'static,
  {
    self.ensure_step_exists(step_name);
    let handler: StepHandler<T> = Box::new(move |ctx| {
      let fut = handler_fn(ctx);
      Box::pin(async move { fut.await.map_err(Into::into) })
    });
    self.handlers.insert(step_name.to_string(), handler);
  }

  /// Sets the compensation of `step_name`.
  pub fn compensate<F, E>(
    &mut self,
    step_name: &str,
    compensation_fn: impl Fn(SagaContext<T>) -> F + Send + Sync + 'static,
  ) where
    F: Future<Output = Result<(), E>> + Send + 'static,
    E: Into<ShopError> + Send + 'static,
  {
    self.ensure_step_exists(step_name);
    let compensation: Compensation<T> = Box::new(move |ctx| {
      let fut = compensation_fn(ctx);
      Box::pin(async move { fut.await.map_err(Into::into) })
    });
    self.compensations.insert(step_name.to_string(), compensation);
  }

  pub fn set_skip_condition(&mut self, step_name: &str, skip_if: Option<SkipCondition<T>>) {
    self.ensure_step_exists(step_name);
    if let Some(step) = self.steps.iter_mut().find(|s| s.name == step_name) {
      step.skip_if = skip_if;
    }
  }
}
