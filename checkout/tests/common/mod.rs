// tests/common/mod.rs
#![allow(dead_code)]

use checkout::config::AppConfig;
use checkout::models::{Address, BillingAddress, CartOwner, CartRow, FunnelStep, PlaceOrderRequest, TenantId};
use checkout::state::InMemoryBackends;
use checkout::CheckoutOrchestrator;
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use serde_json::json;
use tracing::Level;

pub const TENANT: &str = "tenant_1";
pub const USER: &str = "user_1";
pub const GUEST: &str = "guest_1";
pub const EMAIL: &str = "buyer@example.com";

pub struct Harness {
  pub backends: InMemoryBackends,
  pub orchestrator: CheckoutOrchestrator,
}

impl Harness {
  pub fn new() -> Self {
    Self::with_config(AppConfig::default())
  }

  pub fn with_config(config: AppConfig) -> Self {
    Self::with_backends(InMemoryBackends::new(), config)
  }

  pub fn with_backends(backends: InMemoryBackends, config: AppConfig) -> Self {
    setup_tracing();
    let orchestrator = CheckoutOrchestrator::new(backends.app_state(config));
    Self { backends, orchestrator }
  }

  pub fn tenant(&self) -> TenantId {
    TenantId::new(TENANT)
  }

  pub fn put_cart(&self, owner: CartOwner, rows: Vec<CartRow>) {
    self.backends.carts.put(owner, rows);
  }

  pub fn put_user_cart(&self, rows: Vec<CartRow>) {
    self.put_cart(CartOwner::User(USER.to_string()), rows);
  }

  pub fn enable_crm(&self) {
    self
      .backends
      .settings
      .set_option(&self.tenant(), checkout::services::settings::CRM_ENABLED_OPTION, json!(true));
  }

  pub fn add_funnel_step(&self, step: FunnelStep) {
    self.backends.funnels.add_step(&self.tenant(), step);
  }
}

pub fn row(product_id: &str, price: Decimal, quantity: f64) -> CartRow {
  CartRow {
    product_id: Some(product_id.to_string()),
    title: Some(format!("Product {}", product_id)),
    unit_price: Some(price),
    quantity,
  }
}

pub fn funnel_step(id: &str, slug: &str, order: i64) -> FunnelStep {
  FunnelStep {
    id: id.to_string(),
    funnel_id: "funnel_1".to_string(),
    funnel_slug: "launch".to_string(),
    is_default_funnel: false,
    slug: Some(slug.to_string()),
    order,
  }
}

pub fn card_data(token: &str) -> serde_json::Value {
  json!({ "opaqueData": { "dataDescriptor": "COMMON.ACCEPT.INAPP.PAYMENT", "dataValue": token } })
}

/// A signed-in buyer paying by card.
pub fn card_request(idempotency_key: Option<&str>) -> PlaceOrderRequest {
  PlaceOrderRequest {
    tenant_id: TenantId::new(TENANT),
    user_id: Some(USER.to_string()),
    guest_session_id: None,
    funnel_step_id: None,
    idempotency_key: idempotency_key.map(str::to_string),
    email: EMAIL.to_string(),
    billing: BillingAddress {
      address: Address {
        name: Some("Ada Buyer".to_string()),
        phone: Some("555-0101".to_string()),
        address1: Some("1 Market St".to_string()),
        city: Some("San Francisco".to_string()),
        postcode: Some("94105".to_string()),
        country: Some("US".to_string()),
        ..Default::default()
      },
      email: None,
    },
    shipping: Address::default(),
    payment_method_id: "authorizenet".to_string(),
    payment_data: Some(card_data("tok_ok")),
    coupon_code: None,
  }
}

pub fn guest_request(idempotency_key: Option<&str>) -> PlaceOrderRequest {
  PlaceOrderRequest {
    user_id: None,
    guest_session_id: Some(GUEST.to_string()),
    ..card_request(idempotency_key)
  }
}

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}
