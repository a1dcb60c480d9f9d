// checkout/src/pipelines/checkout_pipeline.rs

use crate::errors::CheckoutError;
use crate::pipelines::checkout_steps;
use crate::pipelines::contexts::CheckoutCtxData;
use checkout_saga::{Saga, SagaContext, StepSpec};
use tracing::info;

pub const RESOLVE_IDEMPOTENCY: &str = "resolve_idempotency";
pub const LOAD_SETTINGS: &str = "load_settings";
pub const LOAD_CART: &str = "load_cart";
pub const CHECK_ELIGIBILITY: &str = "check_eligibility";
pub const DETECT_SUBSCRIPTION: &str = "detect_subscription";
pub const PRICE_ORDER: &str = "price_order";
pub const RESOLVE_PAYMENT: &str = "resolve_payment";
pub const CREATE_DRAFT: &str = "create_draft";
pub const PERSIST_ATTRIBUTES: &str = "persist_attributes";
pub const SETTLE_PAYMENT: &str = "settle_payment";
pub const START_SUBSCRIPTION: &str = "start_subscription";
pub const SYNC_CRM: &str = "sync_crm";
pub const CLEAR_CART: &str = "clear_cart";
pub const ROUTE_FUNNEL: &str = "route_funnel";

fn replaying(ctx: SagaContext<CheckoutCtxData>) -> bool {
  ctx.read().is_replay()
}

fn not_a_subscription(ctx: SagaContext<CheckoutCtxData>) -> bool {
  ctx.with(|c| c.is_replay() || c.subscription.is_none())
}

/// The order placement saga. Needs an `OrderAttributeJournal` (or another
/// journal keyed on the order id) installed before it runs.
///
/// A replay of a paid order skips everything up to and including payment
/// and the cart clearing, but still finishes a CRM sync that never completed.
/// Recurring billing for a subscription opens only after its first payment
/// settled; a refusal there is logged and leaves the paid order for
/// reconciliation.
pub fn build_checkout_saga() -> Saga<CheckoutCtxData, CheckoutError> {
  let mut saga = Saga::<CheckoutCtxData, CheckoutError>::new(&[
    StepSpec::required(RESOLVE_IDEMPOTENCY),
    StepSpec::required(LOAD_SETTINGS).skip_if(replaying),
    StepSpec::required(LOAD_CART).skip_if(replaying),
    StepSpec::required(CHECK_ELIGIBILITY).skip_if(replaying),
    StepSpec::required(DETECT_SUBSCRIPTION).skip_if(replaying),
    StepSpec::required(PRICE_ORDER).skip_if(replaying),
    StepSpec::required(RESOLVE_PAYMENT).skip_if(replaying),
    // A resumed order already has its header.
    StepSpec::required(CREATE_DRAFT).skip_if(|ctx: SagaContext<CheckoutCtxData>| ctx.read().order_id.is_some()),
    StepSpec::required(PERSIST_ATTRIBUTES).skip_if(replaying),
    StepSpec::required(SETTLE_PAYMENT).journaled().skip_if(replaying),
    StepSpec::required(START_SUBSCRIPTION).best_effort().journaled().skip_if(not_a_subscription),
    StepSpec::required(SYNC_CRM).best_effort().journaled(),
    StepSpec::required(CLEAR_CART).best_effort().journaled().skip_if(replaying),
    StepSpec::required(ROUTE_FUNNEL).best_effort(),
  ]);

  saga.on_step(RESOLVE_IDEMPOTENCY, checkout_steps::resolve_idempotency);
  saga.on_step(LOAD_SETTINGS, checkout_steps::load_settings);
  saga.on_step(LOAD_CART, checkout_steps::load_cart);
  saga.on_step(CHECK_ELIGIBILITY, checkout_steps::check_eligibility);
  saga.on_step(DETECT_SUBSCRIPTION, checkout_steps::detect_subscription);
  saga.on_step(PRICE_ORDER, checkout_steps::price_order);
  saga.on_step(RESOLVE_PAYMENT, checkout_steps::resolve_payment);
  saga.on_step(CREATE_DRAFT, checkout_steps::create_draft);
  saga.on_step(PERSIST_ATTRIBUTES, checkout_steps::persist_attributes);
  saga.on_step(SETTLE_PAYMENT, checkout_steps::settle_payment);
  saga.on_step(START_SUBSCRIPTION, checkout_steps::start_subscription);
  saga.on_step(SYNC_CRM, checkout_steps::sync_crm);
  saga.on_step(CLEAR_CART, checkout_steps::clear_cart);
  saga.on_step(ROUTE_FUNNEL, checkout_steps::route_funnel);

  info!(steps = saga.step_names().len(), "Checkout saga built.");
  saga
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn steps_follow_checkout_order() {
    let saga = build_checkout_saga();
    assert_eq!(
      saga.step_names(),
      vec![
        RESOLVE_IDEMPOTENCY,
        LOAD_SETTINGS,
        LOAD_CART,
        CHECK_ELIGIBILITY,
        DETECT_SUBSCRIPTION,
        PRICE_ORDER,
        RESOLVE_PAYMENT,
        CREATE_DRAFT,
        PERSIST_ATTRIBUTES,
        SETTLE_PAYMENT,
        START_SUBSCRIPTION,
        SYNC_CRM,
        CLEAR_CART,
        ROUTE_FUNNEL,
      ]
    );
  }
}
