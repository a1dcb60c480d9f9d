// checkout/src/main.rs

use checkout::config::{AppConfig, LogFormat};
use checkout::errors::{CheckoutError, Result as CheckoutResult};
use checkout::models::{keys, BillingAddress, CartOwner, CartRow, PlaceOrderRequest, TenantId};
use checkout::services::settings::{CRM_ENABLED_OPTION, ECOMMERCE_SETTINGS_OPTION};
use checkout::services::DiscountRule;
use checkout::state::InMemoryBackends;
use checkout::CheckoutOrchestrator;
use rust_decimal::Decimal;
use serde_json::json;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

const DEMO_TENANT: &str = "tenant_demo";
const DEMO_USER: &str = "user_demo";

fn init_tracing(format: LogFormat) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_span_events(FmtSpan::CLOSE);
  match format {
    LogFormat::Text => builder.compact().init(),
    LogFormat::Json => builder.json().init(),
  }
}

/// Seeds a tenant with settings, a small catalog, a discount and a cart.
fn seed(backends: &InMemoryBackends) {
  let tenant = TenantId::new(DEMO_TENANT);
  backends
    .settings
    .set_option(&tenant, ECOMMERCE_SETTINGS_OPTION, json!({ "defaultCurrency": "USD" }));
  backends.settings.set_option(&tenant, CRM_ENABLED_OPTION, json!(true));
  backends.settings.set_tenant_slug(&tenant, "demo-store");

  backends
    .catalog
    .set_attribute("prod_course", keys::PRODUCT_CRM_TAG_SLUGS, r#"["course-buyer"]"#);
  backends
    .discounts
    .add_rule("WELCOME10", DiscountRule::Percent(Decimal::new(10, 0)));

  backends.carts.put(
    CartOwner::User(DEMO_USER.to_string()),
    vec![
      CartRow {
        product_id: Some("prod_course".to_string()),
        title: Some("Trading Fundamentals".to_string()),
        unit_price: Some(Decimal::new(19900, 2)),
        quantity: 1.0,
      },
      CartRow {
        product_id: Some("prod_ebook".to_string()),
        title: Some("Chart Patterns eBook".to_string()),
        unit_price: Some(Decimal::new(2450, 2)),
        quantity: 2.0,
      },
    ],
  );
}

fn demo_request() -> PlaceOrderRequest {
  PlaceOrderRequest {
    tenant_id: TenantId::new(DEMO_TENANT),
    user_id: Some(DEMO_USER.to_string()),
    guest_session_id: None,
    funnel_step_id: None,
    idempotency_key: Some(format!("demo-{}", uuid::Uuid::new_v4().simple())),
    email: "buyer@example.com".to_string(),
    billing: BillingAddress {
      address: checkout::models::Address {
        name: Some("Demo Buyer".to_string()),
        postcode: Some("94105".to_string()),
        country: Some("US".to_string()),
        ..Default::default()
      },
      email: None,
    },
    shipping: Default::default(),
    payment_method_id: "authorizenet".to_string(),
    payment_data: Some(json!({
      "opaqueData": { "dataDescriptor": "COMMON.ACCEPT.INAPP.PAYMENT", "dataValue": "tok_demo" }
    })),
    coupon_code: Some("WELCOME10".to_string()),
  }
}

fn load_request(config: &AppConfig) -> CheckoutResult<PlaceOrderRequest> {
  let Some(path) = &config.demo_request_path else {
    return Ok(demo_request());
  };
  let raw = std::fs::read_to_string(path)
    .map_err(|e| CheckoutError::Config(format!("Cannot read demo request {}: {}", path.display(), e)))?;
  serde_json::from_str(&raw)
    .map_err(|e| CheckoutError::Config(format!("Demo request {} is not a valid order request: {}", path.display(), e)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let config = AppConfig::from_env()?;
  init_tracing(config.log_format);
  tracing::info!("Starting checkout demo...");

  let request = load_request(&config)?;
  let backends = InMemoryBackends::new();
  seed(&backends);
  let orchestrator = CheckoutOrchestrator::new(backends.app_state(config));

  match orchestrator.place_order(request).await {
    Ok(response) => {
      let body = serde_json::to_string(&response)?;
      tracing::info!(response = %body, "Checkout succeeded.");
      for (key, value) in backends.orders.attributes(&response.order_id) {
        tracing::debug!(%key, %value, "order attribute");
      }
      Ok(())
    }
    Err(e) => {
      tracing::error!(error = %e, "Checkout failed.");
      Err(e.into())
    }
  }
}
