// tests/saga_execution_tests.rs
mod common;

use checkout_saga::{SagaContext, Saga, SagaError, SagaStatus, StepControl, StepSpec};
use common::*;
use serial_test::serial;

#[tokio::test]
#[serial]
async fn test_saga_runs_steps_in_order() {
  setup_tracing();
  let mut saga = Saga::<TestContext, TestError>::new(&[
    StepSpec::required("step1"),
    StepSpec::required("step2"),
    StepSpec::required("step3"),
  ]);

  saga.on_step("step1", create_simple_handler("step1", " S1"));
  saga.on_step("step2", create_simple_handler("step2", " S2"));
  saga.on_step("step3", create_simple_handler("step3", " S3"));

  let ctx = SagaContext::new(TestContext::default());
  let report = saga.run(ctx.clone()).await.unwrap();

  assert!(report.is_completed());
  assert_eq!(report.executed, vec!["step1", "step2", "step3"]);
  assert!(report.skipped.is_empty());

  let guard = ctx.read();
  assert_eq!(guard.counter, 3);
  assert_eq!(guard.message, " S1 S2 S3");
}

#[tokio::test]
#[serial]
async fn test_saga_halts_on_step_control_halt() {
  setup_tracing();
  let mut saga = Saga::<TestContext, TestError>::new(&[
    StepSpec::required("stepA"),
    StepSpec::required("haltStep"),
    StepSpec::required("stepC"),
  ]);

  saga.on_step("stepA", create_simple_handler("stepA", "A"));
  saga.on_step("haltStep", |ctx: SagaContext<TestContext>| {
    Box::pin(async move {
      ctx.write().steps_executed.push("haltStep".to_string());
      Ok::<StepControl, SagaError>(StepControl::Halt)
    })
  });
  saga.on_step("stepC", create_simple_handler("stepC", "C"));

  let ctx = SagaContext::new(TestContext::default());
  let report = saga.run(ctx.clone()).await.unwrap();

  assert_eq!(
    report.status,
    SagaStatus::Halted {
      step: "haltStep".to_string()
    }
  );
  assert_eq!(report.executed, vec!["stepA"]);
  assert_eq!(ctx.read().steps_executed, vec!["stepA", "haltStep"]);
}

#[tokio::test]
#[serial]
async fn test_saga_skips_step_if_condition_met() {
  setup_tracing();
  let mut saga = Saga::<TestContext, TestError>::new(&[
    StepSpec::required("step1"),
    StepSpec::required("step_to_skip").skip_if(|ctx: SagaContext<TestContext>| ctx.read().counter > 0),
    StepSpec::required("step3"),
  ]);

  saga.on_step("step1", create_simple_handler("step1", " S1"));
  saga.on_step("step_to_skip", create_simple_handler("step_to_skip", " SKIPPED_THIS"));
  saga.on_step("step3", create_simple_handler("step3", " S3"));

  let ctx = SagaContext::new(TestContext::default());
  let report = saga.run(ctx.clone()).await.unwrap();

  assert_eq!(report.executed, vec!["step1", "step3"]);
  assert_eq!(report.skipped, vec!["step_to_skip"]);
  assert_eq!(ctx.read().message, " S1 S3");
}

#[tokio::test]
#[serial]
async fn test_skip_condition_sees_state_left_by_earlier_steps() {
  setup_tracing();
  let mut saga = Saga::<TestContext, TestError>::new(&[
    StepSpec::required("set_key"),
    StepSpec::required("needs_no_key").skip_if(|ctx: SagaContext<TestContext>| ctx.read().run_key.is_some()),
  ]);

  saga.on_step("set_key", |ctx: SagaContext<TestContext>| {
    Box::pin(async move {
      ctx.update(|c| c.run_key = Some("k".to_string()));
      Ok::<_, TestError>(StepControl::Continue)
    })
  });
  saga.on_step("needs_no_key", create_simple_handler("needs_no_key", "X"));

  let ctx = SagaContext::new(TestContext::default());
  let report = saga.run(ctx.clone()).await.unwrap();
  assert_eq!(report.skipped, vec!["needs_no_key"]);
  assert_eq!(ctx.read().counter, 0);
}

#[tokio::test]
#[serial]
async fn test_before_on_after_execution_order() {
  setup_tracing();
  let mut saga = Saga::<TestContext, TestError>::new(&[StepSpec::required("main_step")]);

  saga.after_step("main_step", create_simple_handler("after_main", "After;"));
  saga.on_step("main_step", create_simple_handler("on_main", "On;"));
  saga.before_step("main_step", create_simple_handler("before_main", "Before;"));

  let ctx = SagaContext::new(TestContext::default());
  saga.run(ctx.clone()).await.unwrap();

  let guard = ctx.read();
  assert_eq!(guard.message, "Before;On;After;");
  assert_eq!(guard.steps_executed, vec!["before_main", "on_main", "after_main"]);
}

#[tokio::test]
#[serial]
async fn test_halt_in_before_phase_skips_rest_of_step() {
  setup_tracing();
  let mut saga = Saga::<TestContext, TestError>::new(&[StepSpec::required("guarded"), StepSpec::required("next")]);

  saga.before_step("guarded", create_simple_handler("before_guarded", "B"));
  saga.on_step("guarded", create_simple_handler("on_guarded", "O"));
  saga.on_step("next", create_simple_handler("next", "N"));

  let ctx = SagaContext::new(TestContext {
    halt_at: Some("before_guarded".to_string()),
    ..Default::default()
  });
  let report = saga.run(ctx.clone()).await.unwrap();

  assert!(!report.is_completed());
  assert_eq!(ctx.read().steps_executed, vec!["before_guarded"]);
}

#[tokio::test]
#[serial]
async fn test_step_names_follow_definition_order() {
  let saga = Saga::<TestContext, TestError>::new(&[
    StepSpec::required("a"),
    StepSpec::required("b").best_effort(),
    StepSpec::required("c"),
  ]);
  assert_eq!(saga.step_names(), vec!["a", "b", "c"]);
}

#[test]
#[should_panic(expected = "already exists")]
fn test_duplicate_step_name_panics() {
  let _ = Saga::<TestContext, TestError>::new(&[StepSpec::required("dup"), StepSpec::required("dup")]);
}

#[test]
#[should_panic(expected = "not found")]
fn test_registering_handler_for_unknown_step_panics() {
  let mut saga = Saga::<TestContext, TestError>::new(&[StepSpec::required("known")]);
  saga.on_step("unknown", create_simple_handler("unknown", ""));
}
