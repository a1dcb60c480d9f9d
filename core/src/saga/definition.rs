// checkout_saga/src/saga/definition.rs

//! Contains the `Saga<TData, Err>` struct and its construction.

use crate::core::handler::Handler;
use crate::core::journal::StepJournal;
use crate::core::step::{StepDef, StepSpec};
use std::collections::HashMap;
use std::sync::Arc;

/// An ordered list of named steps over a shared `TData`, whose handlers
/// return `Err`.
///
/// `Err` must be `From<SagaError>` so that framework failures (a missing
/// handler, a broken journal) surface through the same error type as the
/// handlers' own.
pub struct Saga<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<crate::error::SagaError> + Send + Sync + 'static,
{
  pub(crate) steps: Vec<StepDef<TData>>,

  pub(crate) before: HashMap<String, Vec<Handler<TData, Err>>>,
  pub(crate) on: HashMap<String, Vec<Handler<TData, Err>>>,
  pub(crate) after: HashMap<String, Vec<Handler<TData, Err>>>,

  pub(crate) journal: Option<Arc<dyn StepJournal<TData>>>,
}

impl<TData, Err> Saga<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<crate::error::SagaError> + Send + Sync + 'static,
{
  /// Creates a saga from its step specs, in execution order.
  ///
  /// Panics on duplicate step names: that is a wiring mistake, not a runtime condition.
  pub fn new(specs: &[StepSpec<TData>]) -> Self {
    let mut saga = Self {
      steps: Vec::with_capacity(specs.len()),
      before: HashMap::new(),
      on: HashMap::new(),
      after: HashMap::new(),
      journal: None,
    };
    for spec in specs {
      saga.ensure_step_not_exists(&spec.name);
      saga.steps.push(StepDef::from(spec.clone()));
    }
    saga
  }

  /// Installs the journal used by steps declared `.journaled()`.
  pub fn set_journal(&mut self, journal: Arc<dyn StepJournal<TData>>) {
    self.journal = Some(journal);
  }

  pub fn step_names(&self) -> Vec<&str> {
    self.steps.iter().map(|s| s.name.as_str()).collect()
  }

  /// Panics if the step is unknown (typo in a step name while wiring handlers).
  pub(crate) fn ensure_step_exists(&self, step_name: &str) {
    if !self.steps.iter().any(|s| s.name == step_name) {
      panic!("Saga setup error: Step '{}' not found in saga definition.", step_name);
    }
  }

  fn ensure_step_not_exists(&self, step_name: &str) {
    if self.steps.iter().any(|s| s.name == step_name) {
      panic!("Saga setup error: Step '{}' already exists in saga definition.", step_name);
    }
  }
}
