// tests/context_tests.rs
mod common;

use checkout_saga::{SagaContext, Saga, SagaError, StepControl, StepSpec};
use common::*;
use serial_test::serial;

#[tokio::test]
#[serial]
async fn test_context_is_shared_between_steps() {
  setup_tracing();
  let mut saga = Saga::<TestContext, TestError>::new(&[StepSpec::required("step1_modify"), StepSpec::required("step2_read_modify")]);

  saga.on_step("step1_modify", |ctx: SagaContext<TestContext>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.counter = 10;
      guard.message = "SetByStep1".to_string();
      Ok::<StepControl, SagaError>(StepControl::Continue)
    })
  });

  saga.on_step("step2_read_modify", |ctx: SagaContext<TestContext>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      assert_eq!(guard.counter, 10);
      guard.counter += 5;
      guard.message.push_str("_ThenStep2");
      Ok::<StepControl, SagaError>(StepControl::Continue)
    })
  });

  let ctx = SagaContext::new(TestContext::default());
  saga.run(ctx.clone()).await.unwrap();

  let final_guard = ctx.read();
  assert_eq!(final_guard.counter, 15);
  assert_eq!(final_guard.message, "SetByStep1_ThenStep2");
}

#[tokio::test]
#[serial]
async fn test_context_clone_shares_data() {
  let original = SagaContext::new(TestContext {
    counter: 1,
    ..Default::default()
  });
  let cloned = original.clone();

  original.update(|c| c.counter = 5);
  assert_eq!(cloned.with(|c| c.counter), 5);

  cloned.write().counter = 10;
  assert_eq!(original.read().counter, 10);
}

#[tokio::test]
#[serial]
async fn test_context_locks_released_around_await() {
  let ctx = SagaContext::new(TestContext::default());

  let handler_logic = async {
    let initial = ctx.with(|c| c.counter);
    tokio::time::sleep(std::time::Duration::from_millis(1)).await;
    ctx.update(|c| c.counter = initial + 1);
  };

  handler_logic.await;
  assert_eq!(ctx.read().counter, 1);
}
