// checkout_saga/src/lib.rs

//! An async, ordered step engine for sequencing side effects that cannot
//! share one transaction.
//!
//! A `Saga<TData, Err>` is a list of named steps run one after another over
//! a shared `SagaContext<TData>`:
//!  - Each step has `before`/`on`/`after` handler phases.
//!  - A step can be skipped by a condition evaluated just before it runs.
//!  - Required steps abort the run on error; best-effort steps log, get
//!    recorded in the report, and let the run continue.
//!  - Journaled steps record their completion through a `StepJournal`, so a
//!    retried run skips what an earlier run already did.
//!  - Any handler can halt the run early with `StepControl::Halt`.

pub mod core;
pub mod error;
pub mod saga;

pub use crate::core::context::SagaContext;
pub use crate::core::control::{DegradedStep, SagaReport, SagaStatus, StepControl};
pub use crate::core::handler::Handler;
pub use crate::core::journal::StepJournal;
pub use crate::core::step::{SkipCondition, StepDef, StepKind, StepSpec};

pub use crate::saga::definition::Saga;

pub use crate::error::{SagaError, SagaResult};

/*
    Typical wiring:
    1. Define a context struct `Ctx` holding the run's inputs and the results each step leaves behind.
    2. Build `Saga::<Ctx, MyError>::new(&[StepSpec::required("a"), StepSpec::required("b").best_effort()])`.
    3. Register handlers with `.on_step("a", |ctx| Box::pin(async move { ... }))`.
    4. If any step is `.journaled()`, install a journal with `.set_journal(Arc::new(MyJournal))`.
    5. Per run: `saga.run(SagaContext::new(ctx)).await`, then read results back out of the context.
*/
