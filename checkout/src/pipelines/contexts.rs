// checkout/src/pipelines/contexts.rs

//! Data carried through the checkout saga.
//! Handlers receive it wrapped in `checkout_saga::SagaContext`.

use crate::components::eligibility::ProductAttributeCache;
use crate::components::{PricedOrder, PriorOrder, SettlementPlan, SubscriptionTerms};
use crate::models::{CartIdentity, LineItem, OrderId, PaymentMethod, PaymentOutcome, PlaceOrderRequest, TenantId};
use crate::state::AppState;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// One checkout submission. Inputs are set by the orchestrator; every
/// `Option` is filled in by the step that owns it.
#[derive(Clone)]
pub struct CheckoutCtxData {
  pub app_state: AppState,
  pub request: Arc<PlaceOrderRequest>,
  pub tenant: TenantId,
  pub identity: CartIdentity,
  /// Clock reading taken once per submission.
  pub now: DateTime<Utc>,
  /// Identifies this submission as the holder of an order's settlement lease.
  pub attempt: String,

  pub prior: PriorOrder,
  pub currency: String,
  pub tenant_slug: Option<String>,
  pub items: Vec<LineItem>,
  pub product_ids: Vec<String>,
  pub product_attributes: ProductAttributeCache,
  pub requires_account: bool,
  pub subscription: Option<SubscriptionTerms>,
  pub pricing: Option<PricedOrder>,
  pub method: Option<PaymentMethod>,
  pub plan: Option<SettlementPlan>,
  pub order_id: Option<OrderId>,
  pub outcome: Option<PaymentOutcome>,
  pub redirect_url: Option<String>,
}

impl CheckoutCtxData {
  pub fn new(app_state: AppState, request: PlaceOrderRequest, identity: CartIdentity, now: DateTime<Utc>) -> Self {
    let currency = app_state.config.default_currency.clone();
    Self {
      tenant: request.tenant_id.clone(),
      request: Arc::new(request),
      app_state,
      identity,
      now,
      attempt: Uuid::new_v4().simple().to_string(),
      prior: PriorOrder::None,
      currency,
      tenant_slug: None,
      items: Vec::new(),
      product_ids: Vec::new(),
      product_attributes: ProductAttributeCache::new(),
      requires_account: false,
      subscription: None,
      pricing: None,
      method: None,
      plan: None,
      order_id: None,
      outcome: None,
      redirect_url: None,
    }
  }

  /// A paid order already exists for this idempotency key.
  pub fn is_replay(&self) -> bool {
    self.prior.is_replay()
  }
}
