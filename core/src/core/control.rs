// checkout_saga/src/core/control.rs

//! Flow-control signals returned by handlers and the report of a finished run.

/// Signal from a handler indicating whether the saga should go on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepControl {
  /// Continue with the remaining handlers and steps.
  Continue,
  /// Stop the saga here. Nothing after this handler runs, and the run is
  /// reported as halted rather than failed.
  Halt,
}

/// How a saga run ended when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SagaStatus {
  Completed,
  Halted { step: String },
}

/// A best-effort step that failed and was stepped over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DegradedStep {
  pub step: String,
  pub error: String,
}

/// Everything a caller may want to know about a run that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SagaReport {
  pub status: SagaStatus,
  /// Steps whose handlers ran to completion, in order.
  pub executed: Vec<String>,
  /// Steps skipped by a skip condition or an already-completed journal entry.
  pub skipped: Vec<String>,
  /// Best-effort steps that failed, and steps whose journal entry could not be written.
  pub degraded: Vec<DegradedStep>,
}

impl SagaReport {
  pub(crate) fn new() -> Self {
    Self {
      status: SagaStatus::Completed,
      executed: Vec::new(),
      skipped: Vec::new(),
      degraded: Vec::new(),
    }
  }

  pub fn is_completed(&self) -> bool {
    self.status == SagaStatus::Completed
  }

  pub fn was_degraded(&self, step: &str) -> bool {
    self.degraded.iter().any(|d| d.step == step)
  }
}
