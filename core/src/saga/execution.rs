// checkout_saga/src/saga/execution.rs

//! Contains `Saga::run()`, which executes the steps in order.

use crate::core::context::SagaContext;
use crate::core::control::{DegradedStep, SagaReport, SagaStatus, StepControl};
use crate::core::handler::Handler;
use crate::core::step::{StepDef, StepKind};
use crate::error::SagaError;
use crate::saga::definition::Saga;
use tracing::{event, instrument, span, Instrument, Level};

enum StepOutcome {
  Ran,
  /// Handlers succeeded but the journal could not record it.
  RanUnrecorded(SagaError),
  Skipped,
  Halted,
}

impl<TData, Err> Saga<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<SagaError> + Send + Sync + 'static,
{
  /// Executes the saga against the shared context `ctx`.
  ///
  /// Steps run strictly one after another. A required step's error ends
  /// the run and is returned unchanged; a best-effort step's error is
  /// logged, recorded in `SagaReport::degraded`, and the run goes on.
  /// A journal write that fails after a step's handlers succeeded never
  /// fails the run: the step counts as executed and is also listed in
  /// `SagaReport::degraded`.
  /// Wiring mistakes (a step with no handlers, a journaled step with no
  /// journal) are returned as `SagaError`s converted into `Err`, whatever
  /// the step's kind.
  #[instrument(
    name = "Saga::run",
    skip_all,
    fields(
      saga_context_type = %std::any::type_name::<TData>(),
      num_steps = self.steps.len(),
    ),
    err(Display)
  )]
  pub async fn run(&self, ctx: SagaContext<TData>) -> Result<SagaReport, Err> {
    event!(Level::DEBUG, "Saga execution starting.");
    let mut report = SagaReport::new();

    for (step_idx, step_def) in self.steps.iter().enumerate() {
      self.check_wiring(step_def)?;

      let step_span = span!(
        Level::INFO,
        "saga_step",
        step_name = step_def.name.as_str(),
        step_index = step_idx,
        kind = ?step_def.kind,
        journaled = step_def.journaled
      );

      match self.run_step(step_def, &ctx).instrument(step_span).await {
        Ok(StepOutcome::Ran) => report.executed.push(step_def.name.clone()),
        Ok(StepOutcome::RanUnrecorded(e)) => {
          event!(Level::WARN, step_name = %step_def.name, error = %e, "Step completed but its journal entry was not written.");
          report.executed.push(step_def.name.clone());
          report.degraded.push(DegradedStep {
            step: step_def.name.clone(),
            error: e.to_string(),
          });
        }
        Ok(StepOutcome::Skipped) => report.skipped.push(step_def.name.clone()),
        Ok(StepOutcome::Halted) => {
          event!(Level::INFO, step_name = %step_def.name, "Saga halted by a handler.");
          report.status = SagaStatus::Halted {
            step: step_def.name.clone(),
          };
          return Ok(report);
        }
        Err(e) => match step_def.kind {
          StepKind::Required => {
            event!(Level::ERROR, step_name = %step_def.name, error = %e, "Required step failed.");
            return Err(e);
          }
          StepKind::BestEffort => {
            event!(Level::WARN, step_name = %step_def.name, error = %e, "Best-effort step failed, continuing.");
            report.degraded.push(DegradedStep {
              step: step_def.name.clone(),
              error: e.to_string(),
            });
          }
        },
      }
    }

    event!(Level::DEBUG, "Saga execution completed.");
    Ok(report)
  }

  fn check_wiring(&self, step_def: &StepDef<TData>) -> Result<(), Err> {
    let name = step_def.name.as_str();
    let has_handlers = [&self.before, &self.on, &self.after]
      .iter()
      .any(|phase| phase.get(name).map_or(false, |v| !v.is_empty()));
    if !has_handlers {
      return Err(Err::from(SagaError::HandlerMissing {
        step_name: step_def.name.clone(),
      }));
    }
    if step_def.journaled && self.journal.is_none() {
      return Err(Err::from(SagaError::ConfigurationError {
        step_name: step_def.name.clone(),
        message: "step is journaled but no journal is installed".to_string(),
      }));
    }
    Ok(())
  }

  async fn run_step(&self, step_def: &StepDef<TData>, ctx: &SagaContext<TData>) -> Result<StepOutcome, Err> {
    let name = step_def.name.as_str();

    if let Some(skip_cond_fn) = &step_def.skip_if {
      if skip_cond_fn(ctx.clone()) {
        event!(Level::INFO, "Step skipped due to 'skip_if' condition.");
        return Ok(StepOutcome::Skipped);
      }
    }

    let journal = if step_def.journaled { self.journal.as_ref() } else { None };

    if let Some(journal) = journal {
      let done = journal
        .is_completed(ctx, name)
        .await
        .map_err(|source| journal_failure(name, source))?;
      if done {
        event!(Level::INFO, "Step already recorded as completed, skipping.");
        return Ok(StepOutcome::Skipped);
      }
    }

    for (phase, handlers) in [("before", &self.before), ("on", &self.on), ("after", &self.after)] {
      if let Some(handlers) = handlers.get(name) {
        if let StepControl::Halt = run_phase(phase, handlers, ctx).await? {
          return Ok(StepOutcome::Halted);
        }
      }
    }

    if let Some(journal) = journal {
      if let Err(source) = journal.record_completed(ctx, name).await {
        return Ok(StepOutcome::RanUnrecorded(SagaError::JournalFailure {
          step_name: name.to_string(),
          source,
        }));
      }
      event!(Level::DEBUG, "Step completion recorded.");
    }

    Ok(StepOutcome::Ran)
  }
}

async fn run_phase<TData, Err>(
  phase: &'static str,
  handlers: &[Handler<TData, Err>],
  ctx: &SagaContext<TData>,
) -> Result<StepControl, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + Send + Sync + 'static,
{
  for (handler_idx, handler_fn) in handlers.iter().enumerate() {
    let handler_span = span!(Level::DEBUG, "saga_handler", phase, handler_index = handler_idx);
    match handler_fn(ctx.clone()).instrument(handler_span).await {
      Ok(StepControl::Continue) => {}
      Ok(StepControl::Halt) => return Ok(StepControl::Halt),
      Err(e) => {
        event!(Level::DEBUG, phase, error = %e, "Handler failed.");
        return Err(e);
      }
    }
  }
  Ok(StepControl::Continue)
}

fn journal_failure<Err: From<SagaError>>(step_name: &str, source: anyhow::Error) -> Err {
  Err::from(SagaError::JournalFailure {
    step_name: step_name.to_string(),
    source,
  })
}
