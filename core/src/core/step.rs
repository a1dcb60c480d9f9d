// checkout_saga/src/core/step.rs

//! Defines the structure for a single step within a saga.

use super::SagaContext;
use std::sync::Arc;

/// Skip condition evaluated right before a step would run. `true` skips it.
pub type SkipCondition<TData> = Arc<dyn Fn(SagaContext<TData>) -> bool + Send + Sync + 'static>;

/// How a step's failure is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
  /// Any handler error aborts the saga and is returned to the caller.
  Required,
  /// Handler errors are logged and recorded in the report; the saga goes on.
  BestEffort,
}

/// Declarative description of a step, used to build a `Saga`.
///
/// ```ignore
/// Saga::<Ctx, MyError>::new(&[
///   StepSpec::required("reserve"),
///   StepSpec::required("charge").journaled(),
///   StepSpec::required("notify").best_effort(),
/// ]);
/// ```
pub struct StepSpec<TData: 'static + Send + Sync> {
  pub(crate) name: String,
  pub(crate) kind: StepKind,
  pub(crate) journaled: bool,
  pub(crate) skip_if: Option<SkipCondition<TData>>,
}

impl<TData: 'static + Send + Sync> StepSpec<TData> {
  pub fn required(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      kind: StepKind::Required,
      journaled: false,
      skip_if: None,
    }
  }

  /// Failures of this step are contained and never fail the saga.
  pub fn best_effort(mut self) -> Self {
    self.kind = StepKind::BestEffort;
    self
  }

  /// Completion of this step is recorded in the saga's journal, and a later
  /// run that finds it recorded skips the step.
  pub fn journaled(mut self) -> Self {
    self.journaled = true;
    self
  }

  pub fn skip_if(mut self, cond: impl Fn(SagaContext<TData>) -> bool + Send + Sync + 'static) -> Self {
    self.skip_if = Some(Arc::new(cond));
    self
  }
}

impl<TData: 'static + Send + Sync> Clone for StepSpec<TData> {
  fn clone(&self) -> Self {
    Self {
      name: self.name.clone(),
      kind: self.kind,
      journaled: self.journaled,
      skip_if: self.skip_if.clone(),
    }
  }
}

/// A step as stored inside a built saga.
#[derive(Clone)]
pub struct StepDef<T: 'static + Send + Sync> {
  pub name: String,
  pub kind: StepKind,
  pub journaled: bool,
  pub skip_if: Option<SkipCondition<T>>,
}

impl<T: 'static + Send + Sync> From<StepSpec<T>> for StepDef<T> {
  fn from(spec: StepSpec<T>) -> Self {
    Self {
      name: spec.name,
      kind: spec.kind,
      journaled: spec.journaled,
      skip_if: spec.skip_if,
    }
  }
}

// SkipCondition has no Debug of its own.
impl<T: 'static + Send + Sync> std::fmt::Debug for StepDef<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("StepDef")
      .field("name", &self.name)
      .field("kind", &self.kind)
      .field("journaled", &self.journaled)
      .field("skip_if_present", &self.skip_if.is_some())
      .finish()
  }
}
