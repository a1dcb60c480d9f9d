// checkout_saga/src/core/journal.rs

//! Defines `StepJournal<TData>`, where journaled steps record that they finished.

use crate::core::context::SagaContext;
use async_trait::async_trait;

/// Durable record of which journaled steps have completed.
///
/// The journal receives the run's context, so it can key its records on
/// whatever the earlier steps put there (an order id, a correlation id).
/// A journal that cannot yet locate its record should report the step as
/// not completed and make `record_completed` a no-op.
#[async_trait]
pub trait StepJournal<TData>: Send + Sync
where
  TData: 'static + Send + Sync,
{
  async fn is_completed(&self, ctx: &SagaContext<TData>, step_name: &str) -> anyhow::Result<bool>;

  async fn record_completed(&self, ctx: &SagaContext<TData>, step_name: &str) -> anyhow::Result<()>;
}
