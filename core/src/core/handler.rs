// checkout_saga/src/core/handler.rs

use crate::core::context::SagaContext;
use crate::core::control::StepControl;
use std::future::Future;
use std::pin::Pin;

/// Type alias for a saga step handler.
///
/// A handler is an asynchronous function that takes a handle to the shared
/// `SagaContext<TData>` and resolves to `Result<StepControl, Err>`.
///
/// Handlers are responsible for:
/// 1. Taking `.read()`/`.write()` locks on the context to get at their inputs and store their outputs.
/// 2. **Dropping every lock guard BEFORE any `.await` point.**
/// 3. Doing their I/O in between.
/// 4. Returning `StepControl::Continue` to go on or `StepControl::Halt` to end the run early.
pub type Handler<TData, Err> =
  Box<dyn Fn(SagaContext<TData>) -> Pin<Box<dyn Future<Output = Result<StepControl, Err>> + Send>> + Send + Sync>;
