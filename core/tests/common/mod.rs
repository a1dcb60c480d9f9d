// tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use checkout_saga::{SagaContext, SagaError, StepControl, StepJournal};
use parking_lot::Mutex;
use std::collections::HashSet;
use tracing::Level;

#[derive(Clone, Debug, Default)]
pub struct TestContext {
  pub counter: i32,
  pub message: String,
  pub steps_executed: Vec<String>,
  pub halt_at: Option<String>,
  /// Key a journal uses to find its records; `None` until a step sets it.
  pub run_key: Option<String>,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TestError {
  #[error("Saga framework error: {0}")]
  Saga(String),

  #[error("Test handler failed: {0}")]
  Handler(String),
}

impl From<SagaError> for TestError {
  fn from(se: SagaError) -> Self {
    TestError::Saga(format!("{:?}", se))
  }
}

pub fn create_simple_handler(
  step_name: &'static str,
  message_to_append: &'static str,
) -> checkout_saga::Handler<TestContext, TestError> {
  Box::new(move |ctx: SagaContext<TestContext>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.counter += 1;
      guard.message.push_str(message_to_append);
      guard.steps_executed.push(step_name.to_string());
      tracing::debug!(target: "test_handlers", step = step_name, counter = guard.counter, "executed");
      if guard.halt_at.as_deref() == Some(step_name) {
        return Ok(StepControl::Halt);
      }
      Ok(StepControl::Continue)
    })
  })
}

pub fn create_failing_handler(
  step_name: &'static str,
  error_message: &'static str,
) -> checkout_saga::Handler<TestContext, TestError> {
  Box::new(move |ctx: SagaContext<TestContext>| {
    Box::pin(async move {
      ctx.write().steps_executed.push(step_name.to_string());
      tracing::warn!(target: "test_handlers", step = step_name, "failing with: '{}'", error_message);
      Err(TestError::Handler(error_message.to_string()))
    })
  })
}

/// Journal keeping `(run_key, step)` pairs in memory.
#[derive(Default)]
pub struct MemoryJournal {
  pub entries: Mutex<HashSet<(String, String)>>,
  pub fail_reads: bool,
  pub fail_writes: bool,
}

impl MemoryJournal {
  pub fn recorded(&self, run_key: &str, step: &str) -> bool {
    self.entries.lock().contains(&(run_key.to_string(), step.to_string()))
  }
}

#[async_trait]
impl StepJournal<TestContext> for MemoryJournal {
  async fn is_completed(&self, ctx: &SagaContext<TestContext>, step_name: &str) -> anyhow::Result<bool> {
    if self.fail_reads {
      anyhow::bail!("journal backend unavailable");
    }
    let Some(key) = ctx.with(|c| c.run_key.clone()) else {
      return Ok(false);
    };
    Ok(self.recorded(&key, step_name))
  }

  async fn record_completed(&self, ctx: &SagaContext<TestContext>, step_name: &str) -> anyhow::Result<()> {
    if self.fail_writes {
      anyhow::bail!("journal backend rejected the write");
    }
    if let Some(key) = ctx.with(|c| c.run_key.clone()) {
      self.entries.lock().insert((key, step_name.to_string()));
    }
    Ok(())
  }
}

use once_cell::sync::Lazy;
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}
