// tests/order_attributes_tests.rs
mod common;

use checkout::models::attributes::{is_order_key, saga_marker_key};
use checkout::models::{keys, CartOwner, FulfillmentStatus, OrderStatus, PaymentStatus, ScalarValue};
use checkout::pipelines::checkout_pipeline::{CLEAR_CART, SETTLE_PAYMENT};
use checkout::services::settings::ECOMMERCE_SETTINGS_OPTION;
use checkout::services::MockCharge;
use checkout::CheckoutError;
use common::*;
use rust_decimal_macros::dec;
use serde_json::json;
use serial_test::serial;

fn text(value: Option<ScalarValue>) -> Option<String> {
  value.and_then(|v| v.as_str().map(str::to_string))
}

#[tokio::test]
#[serial]
async fn test_paid_order_carries_full_attribute_set() {
  let h = Harness::new();
  h.backends
    .settings
    .set_option(&h.tenant(), ECOMMERCE_SETTINGS_OPTION, json!({ "defaultCurrency": " EUR " }));
  h.backends.settings.set_tenant_slug(&h.tenant(), "acme");
  h.put_user_cart(vec![row("p1", dec!(4.50), 2.0), row("p2", dec!(1), 1.0)]);

  let response = h.orchestrator.place_order(card_request(Some("idem-attrs"))).await.unwrap();
  let id = &response.order_id;
  let attrs = h.backends.orders.attributes(id);
  let get = |key: &str| attrs.get(key).cloned();

  assert_eq!(text(get(keys::CURRENCY)).as_deref(), Some("EUR"));
  assert_eq!(h.backends.gateway.charges()[0].currency, "EUR");
  assert_eq!(get(keys::ITEMS_SUBTOTAL), Some(ScalarValue::Number(dec!(10))));
  assert_eq!(get(keys::ORDER_TOTAL), Some(ScalarValue::Number(dec!(10))));
  assert_eq!(get(keys::COUPON_CODE), None);
  assert_eq!(text(get(keys::IDEMPOTENCY_KEY)).as_deref(), Some("idem-attrs"));
  assert_eq!(text(get(keys::TENANT_SLUG)).as_deref(), Some("acme"));
  assert_eq!(text(get(keys::PAYMENT_METHOD_ID)).as_deref(), Some("authorizenet"));
  assert_eq!(text(get(keys::GATEWAY)).as_deref(), Some("authorizenet"));
  assert_eq!(text(get(keys::PAYMENT_STATUS)).as_deref(), Some(PaymentStatus::Paid.as_str()));
  assert_eq!(text(get(keys::ORDER_STATUS)).as_deref(), Some(FulfillmentStatus::Processing.as_str()));
  assert_eq!(text(get(keys::CUSTOMER_EMAIL)).as_deref(), Some(EMAIL));
  assert_eq!(text(get(keys::SECONDARY_EMAIL_CANDIDATE)).as_deref(), Some(EMAIL));
  assert_eq!(text(get(keys::BILLING_EMAIL)).as_deref(), Some(EMAIL));
  assert_eq!(text(get(keys::CUSTOMER_PHONE)).as_deref(), Some("555-0101"));
  assert_eq!(text(get(keys::BILLING_NAME)).as_deref(), Some("Ada Buyer"));
  assert_eq!(text(get(keys::BILLING_POSTCODE)).as_deref(), Some("94105"));
  assert_eq!(get(keys::SHIPPING_NAME), None);
  assert_eq!(get(keys::REQUIRES_ACCOUNT), Some(ScalarValue::Bool(false)));
  assert_eq!(text(get(keys::USER_ID)).as_deref(), Some(USER));
  assert_eq!(text(get(keys::LEGACY_USER_ID)).as_deref(), Some(USER));
  assert_eq!(text(get(keys::LEGACY_EMAIL)).as_deref(), Some(EMAIL));
  assert_eq!(get(keys::LEGACY_TOTAL), Some(ScalarValue::Number(dec!(10))));
  assert!(text(get(keys::GATEWAY_TRANSACTION_ID)).is_some_and(|t| t.starts_with("mock_txn_")));

  let items: serde_json::Value = serde_json::from_str(&text(get(keys::ITEMS_JSON)).unwrap()).unwrap();
  assert_eq!(items.as_array().map(Vec::len), Some(2));

  let payload: serde_json::Value = serde_json::from_str(&text(get(keys::LEGACY_PAYLOAD)).unwrap()).unwrap();
  assert_eq!(payload["customerInfo"]["email"], json!(EMAIL));
  assert_eq!(payload["currency"], json!("EUR"));
  assert_eq!(payload["totals"]["total"], json!(10.0));

  let projection: serde_json::Value =
    serde_json::from_str(&text(get(keys::PAYMENT_RESPONSE_JSON)).unwrap()).unwrap();
  assert_eq!(projection["success"], json!(true));
  assert!(projection.get("errorMessage").is_none());

  assert!(get(&saga_marker_key(SETTLE_PAYMENT)).is_some());
  assert!(get(&saga_marker_key(CLEAR_CART)).is_some());
  assert!(attrs.keys().all(|k| is_order_key(k)));
}

#[tokio::test]
#[serial]
async fn test_explicit_billing_email_is_kept() {
  let h = Harness::new();
  h.put_user_cart(vec![row("p1", dec!(3), 1.0)]);
  let mut request = card_request(None);
  request.billing.email = Some("accounts@example.com".to_string());

  let response = h.orchestrator.place_order(request).await.unwrap();

  assert_eq!(
    text(h.backends.orders.attribute(&response.order_id, keys::BILLING_EMAIL)).as_deref(),
    Some("accounts@example.com")
  );
  assert_eq!(
    text(h.backends.orders.attribute(&response.order_id, keys::CUSTOMER_EMAIL)).as_deref(),
    Some(EMAIL)
  );
}

#[tokio::test]
#[serial]
async fn test_unsupported_method_creates_no_order() {
  let h = Harness::new();
  h.put_user_cart(vec![row("p1", dec!(3), 1.0)]);
  let mut request = card_request(None);
  request.payment_method_id = "paypal".to_string();

  let err = h.orchestrator.place_order(request).await.unwrap_err();

  assert!(matches!(err, CheckoutError::UnsupportedPaymentMethod(m) if m == "paypal"));
  assert_eq!(h.backends.orders.order_count(), 0);
  assert_eq!(h.backends.carts.rows(&CartOwner::User(USER.to_string())).len(), 1);
}

#[tokio::test]
#[serial]
async fn test_missing_token_creates_no_order() {
  let h = Harness::new();
  h.put_user_cart(vec![row("p1", dec!(3), 1.0)]);
  let mut request = card_request(None);
  request.payment_data = Some(json!({ "opaqueData": { "dataDescriptor": "d", "dataValue": "  " } }));

  let err = h.orchestrator.place_order(request).await.unwrap_err();

  assert!(matches!(err, CheckoutError::MissingPaymentToken));
  assert_eq!(h.backends.orders.order_count(), 0);
  assert_eq!(h.backends.gateway.charge_count(), 0);
}

#[tokio::test]
#[serial]
async fn test_unreachable_gateway_fails_the_order() {
  let h = Harness::new();
  h.put_user_cart(vec![row("p1", dec!(3), 1.0)]);
  h.backends
    .gateway
    .script(MockCharge::TransportError("connection reset".to_string()));

  let err = h.orchestrator.place_order(card_request(None)).await.unwrap_err();

  assert!(matches!(err, CheckoutError::PaymentDeclined));
  let order = h.backends.gateway.charges()[0].order_id.clone();
  assert_eq!(h.backends.orders.header(&order).unwrap().status, OrderStatus::Failed);
  assert_eq!(
    text(h.backends.orders.attribute(&order, keys::PAYMENT_STATUS)).as_deref(),
    Some(PaymentStatus::Failed.as_str())
  );
  let projection: serde_json::Value =
    serde_json::from_str(&text(h.backends.orders.attribute(&order, keys::PAYMENT_RESPONSE_JSON)).unwrap()).unwrap();
  assert_eq!(projection["success"], json!(false));
  assert_eq!(projection["errorMessage"], json!("connection reset"));
  assert_eq!(h.backends.orders.attribute(&order, keys::GATEWAY_TRANSACTION_ID), None);
  // Nothing was paid, so the cart stays.
  assert_eq!(h.backends.carts.rows(&CartOwner::User(USER.to_string())).len(), 1);
}

#[tokio::test]
#[serial]
async fn test_missing_identity_is_rejected_first() {
  let h = Harness::new();
  let mut request = card_request(None);
  request.user_id = Some("  ".to_string());
  request.guest_session_id = None;
  request.email = String::new();

  let err = h.orchestrator.place_order(request).await.unwrap_err();

  assert!(matches!(err, CheckoutError::MissingCartIdentity));
  assert_eq!(h.backends.orders.order_count(), 0);
}

#[tokio::test]
#[serial]
async fn test_blank_email_is_a_validation_error() {
  let h = Harness::new();
  h.put_user_cart(vec![row("p1", dec!(3), 1.0)]);
  let mut request = card_request(None);
  request.email = "   ".to_string();

  let err = h.orchestrator.place_order(request).await.unwrap_err();

  assert!(matches!(err, CheckoutError::Validation(_)));
  assert_eq!(h.backends.orders.order_count(), 0);
}
