// storefront/src/saga/execution.rs

//! `Saga::run`: forward execution and reverse compensation.

use tracing::{event, instrument, span, Instrument, Level};

use super::context::SagaContext;
use super::definition::Saga;
use crate::error::{ShopError, ShopResult};

impl<T> Saga<T>
where
  T: 'static + Send + Sync,
{
  /// Runs every step in order.
  ///
  /// A failing required step triggers the compensations of that step and of every step
  /// that completed before it, newest first, and then returns the step's own error.
  /// Compensation failures are logged and do not replace that error.
  #[instrument(
    name = "Saga::run",
    skip_all,
    fields(saga = %self.name, num_steps = self.steps.len()),
    err(Display)
  )]
  pub async fn run(&self, ctx: SagaContext<T>) -> ShopResult<()> {
    event!(Level::DEBUG, "Saga starting.");
    let mut completed: Vec<&str> = Vec::new();

    for (step_idx, step_def) in self.steps.iter().enumerate() {
      let step_name = step_def.name.as_str();
      let step_span = span!(
        Level::INFO,
        "saga_step",
        step_name = step_name,
        step_index = step_idx,
        optional = step_def.optional
      );

      if let Some(skip_if) = &step_def.skip_if {
        if skip_if(ctx.clone()) {
          step_span.in_scope(|| event!(Level::INFO, "Step skipped by its skip condition."));
          continue;
        }
      }

      let result = match self.handlers.get(step_name) {
        Some(handler) => handler(ctx.clone()).instrument(step_span.clone()).await,
        None if step_def.optional => {
          step_span.in_scope(|| event!(Level::DEBUG, "Optional step has no handler, skipping."));
          continue;
        }
        None => Err(ShopError::Saga {
          step: step_def.name.clone(),
          source: anyhow::anyhow!("no handler registered for required step"),
        }),
      };

      match result {
        Ok(()) => completed.push(step_name),
        Err(err) if step_def.optional => {
          step_span.in_scope(|| event!(Level::WARN, error = %err, "Optional step failed; continuing."));
        }
        Err(err) => {
          step_span.in_scope(|| event!(Level::ERROR, error = %err, "Step failed; compensating."));
          self.compensate_from(step_name, &completed, &ctx).await;
          return Err(err);
        }
      }
    }

    event!(Level::DEBUG, "Saga completed.");
    Ok(())
  }

  async fn compensate_from(&self, failed_step: &str, completed: &[&str], ctx: &SagaContext<T>) {
    let order = std::iter::once(failed_step).chain(completed.iter().rev().copied());
    for step_name in order {
      let Some(compensation) = self.compensations.get(step_name) else {
        continue;
      };
      let comp_span = span!(Level::INFO, "saga_compensation", step_name = step_name);
      match compensation(ctx.clone()).instrument(comp_span.clone()).await {
        Ok(()) => comp_span.in_scope(|| event!(Level::INFO, "Compensation applied.")),
        Err(err) => comp_span.in_scope(|| {
          event!(Level::ERROR, error = %err, "Compensation failed; manual cleanup required.")
        }),
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::Arc;

  #[derive(Default)]
  struct Trace {
    log: Vec<String>,
  }

  fn saga_with(fail_at: Option<&'static str>) -> Saga<Trace> {
    let mut saga = Saga::new(
      "test",
      &[("a", false, None), ("b", true, None), ("c", false, None), ("d", false, None)],
    );
    for name in ["a", "b", "c", "d"] {
      saga.on_step(name, move |ctx: SagaContext<Trace>| async move {
        ctx.write().log.push(format!("run:{}", name));
        if Some(name) == fail_at {
          return Err(ShopError::Internal(format!("{} failed", name)));
        }
        Ok::<_, ShopError>(())
      });
      saga.compensate(name, move |ctx: SagaContext<Trace>| async move {
        ctx.write().log.push(format!("undo:{}", name));
        Ok::<_, ShopError>(())
      });
    }
    saga
  }

  #[tokio::test]
  async fn failure_compensates_in_reverse() {
    let saga = saga_with(Some("c"));
    let ctx = SagaContext::new(Trace::default());
    let err = saga.run(ctx.clone()).await.unwrap_err();
    assert_eq!(err.to_string(), "Internal storefront error: c failed");
    assert_eq!(
      ctx.read().log,
      vec!["run:a", "run:b", "run:c", "undo:c", "undo:b", "undo:a"]
    );
  }

  #[tokio::test]
  async fn optional_failure_is_not_compensated() {
    let saga = saga_with(Some("b"));
    let ctx = SagaContext::new(Trace::default());
    saga.run(ctx.clone()).await.unwrap();
    assert_eq!(ctx.read().log, vec!["run:a", "run:b", "run:c", "run:d"]);
  }

  #[tokio::test]
  async fn skipped_steps_are_not_compensated() {
    let mut saga = saga_with(Some("d"));
    saga.set_skip_condition("c", Some(Arc::new(|_: SagaContext<Trace>| true)));
    let ctx = SagaContext::new(Trace::default());
    assert!(saga.run(ctx.clone()).await.is_err());
    assert_eq!(
      ctx.read().log,
      vec!["run:a", "run:b", "run:d", "undo:d", "undo:b", "undo:a"]
    );
  }

  #[test]
  fn plan_lists_handlers_and_compensations() {
    let mut saga = saga_with(None);
    saga.set_skip_condition("c", Some(Arc::new(|_: SagaContext<Trace>| false)));
    let bare: Saga<Trace> = Saga::new("bare", &[("only", false, None)]);
    assert_eq!(saga.plan()[1], "b? -> run / undo");
    assert_eq!(saga.plan()[2], "c (conditional) -> run / undo");
    assert_eq!(bare.plan(), vec!["only -> - / -".to_string()]);
  }

  #[tokio::test]
  async fn missing_required_handler_is_a_saga_error() {
    let saga: Saga<Trace> = Saga::new("bare", &[("only", false, None)]);
    let err = saga.run(SagaContext::new(Trace::default())).await.unwrap_err();
    assert!(matches!(err, ShopError::Saga { ref step, .. } if step == "only"));
  }
}
