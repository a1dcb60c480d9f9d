pub mod context;
pub mod control;
pub mod handler;
pub mod journal;
pub mod step;

pub use context::SagaContext;
pub use control::{DegradedStep, SagaReport, SagaStatus, StepControl};
pub use handler::Handler;
pub use journal::StepJournal;
pub use step::{SkipCondition, StepDef, StepKind, StepSpec};
