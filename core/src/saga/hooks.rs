// checkout_saga/src/saga/hooks.rs

//! Registration of `before`, `on` and `after` handlers for saga steps.

use crate::core::context::SagaContext;
use crate::core::control::StepControl;
use crate::core::handler::Handler;
use crate::error::SagaError;
use crate::saga::definition::Saga;
use std::future::Future;

impl<TData, Err> Saga<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<SagaError> + Send + Sync + 'static,
{
  /// Registers a `before` handler for a step.
  ///
  /// The handler may fail with any error convertible into the saga's `Err`.
  pub fn before_step<F, HandlerErr>(
    &mut self,
    step_name: &str,
    handler_fn: impl Fn(SagaContext<TData>) -> F + Send + Sync + 'static,
  ) where
    F: Future<Output = Result<StepControl, HandlerErr>> + Send + 'static,
    HandlerErr: Into<Err> + Send + Sync + 'static,
  {
    self.ensure_step_exists(step_name);
    let handler = wrap_handler(handler_fn);
    self.before.entry(step_name.to_string()).or_default().push(handler);
  }

  /// Registers an `on` handler for a step. This is where a step does its work.
  pub fn on_step<F, HandlerErr>(
    &mut self,
    step_name: &str,
    handler_fn: impl Fn(SagaContext<TData>) -> F + Send + Sync + 'static,
  ) where
    F: Future<Output = Result<StepControl, HandlerErr>> + Send + 'static,
    HandlerErr: Into<Err> + Send + Sync + 'static,
  {
    self.ensure_step_exists(step_name);
    let handler = wrap_handler(handler_fn);
    self.on.entry(step_name.to_string()).or_default().push(handler);
  }

  /// Registers an `after` handler for a step.
  pub fn after_step<F, HandlerErr>(
    &mut self,
    step_name: &str,
    handler_fn: impl Fn(SagaContext<TData>) -> F + Send + Sync + 'static,
  ) where
    F: Future<Output = Result<StepControl, HandlerErr>> + Send + 'static,
    HandlerErr: Into<Err> + Send + Sync + 'static,
  {
    self.ensure_step_exists(step_name);
    let handler = wrap_handler(handler_fn);
    self.after.entry(step_name.to_string()).or_default().push(handler);
  }
}

fn wrap_handler<TData, Err, F, HandlerErr>(
  handler_fn: impl Fn(SagaContext<TData>) -> F + Send + Sync + 'static,
) -> Handler<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: 'static,
  F: Future<Output = Result<StepControl, HandlerErr>> + Send + 'static,
  HandlerErr: Into<Err> + Send + Sync + 'static,
{
  Box::new(move |ctx| {
    let user_fut = handler_fn(ctx);
    Box::pin(async move { user_fut.await.map_err(Into::into) })
  })
}
