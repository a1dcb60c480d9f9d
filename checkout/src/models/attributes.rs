// checkout/src/models/attributes.rs

//! The open-ended attribute bag stored next to an order header.
//!
//! Values are typed scalars; keys are namespaced strings. The constants in
//! [`keys`] are the registry of keys this crate reads and writes.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
  Null,
  Bool(bool),
  Number(#[serde(with = "rust_decimal::serde::float")] Decimal),
  Str(String),
}

impl ScalarValue {
  pub fn as_str(&self) -> Option<&str> {
    match self {
      ScalarValue::Str(s) => Some(s.as_str()),
      _ => None,
    }
  }

  pub fn as_decimal(&self) -> Option<Decimal> {
    match self {
      ScalarValue::Number(n) => Some(*n),
      _ => None,
    }
  }

  pub fn as_bool(&self) -> Option<bool> {
    match self {
      ScalarValue::Bool(b) => Some(*b),
      _ => None,
    }
  }

  /// Loose truthiness used for product flags: `true`, `"true"`, `1` and `"1"`.
  pub fn is_truthy_flag(&self) -> bool {
    match self {
      ScalarValue::Bool(b) => *b,
      ScalarValue::Str(s) => s == "true" || s == "1",
      ScalarValue::Number(n) => *n == Decimal::ONE,
      ScalarValue::Null => false,
    }
  }

  pub fn to_json(&self) -> serde_json::Value {
    match self {
      ScalarValue::Null => serde_json::Value::Null,
      ScalarValue::Bool(b) => serde_json::Value::Bool(*b),
      ScalarValue::Number(n) => n
        .to_f64()
        .and_then(serde_json::Number::from_f64)
        .map_or(serde_json::Value::Null, serde_json::Value::Number),
      ScalarValue::Str(s) => serde_json::Value::String(s.clone()),
    }
  }
}

impl fmt::Display for ScalarValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ScalarValue::Null => f.write_str("null"),
      ScalarValue::Bool(b) => write!(f, "{}", b),
      ScalarValue::Number(n) => write!(f, "{}", n),
      ScalarValue::Str(s) => f.write_str(s),
    }
  }
}

impl From<&str> for ScalarValue {
  fn from(s: &str) -> Self {
    ScalarValue::Str(s.to_string())
  }
}

impl From<String> for ScalarValue {
  fn from(s: String) -> Self {
    ScalarValue::Str(s)
  }
}

impl From<Decimal> for ScalarValue {
  fn from(n: Decimal) -> Self {
    ScalarValue::Number(n)
  }
}

impl From<bool> for ScalarValue {
  fn from(b: bool) -> Self {
    ScalarValue::Bool(b)
  }
}

/// Attribute keys. Every key lives under `order.`, `billing.` or `shipping.`;
/// the `order:` keys are the consolidated legacy read path.
pub mod keys {
  pub const ITEMS_JSON: &str = "order.itemsJson";
  pub const ITEMS_SUBTOTAL: &str = "order.itemsSubtotal";
  pub const ORDER_TOTAL: &str = "order.orderTotal";
  pub const CURRENCY: &str = "order.currency";
  pub const COUPON_CODE: &str = "order.couponCode";
  pub const DISCOUNT_AMOUNT: &str = "order.discountAmount";
  pub const ORDER_STATUS: &str = "order.status";
  pub const CUSTOMER_EMAIL: &str = "order.customerEmail";
  pub const SECONDARY_EMAIL_CANDIDATE: &str = "order.secondaryEmailCandidate";
  pub const CUSTOMER_PHONE: &str = "order.customerPhone";
  pub const REQUIRES_ACCOUNT: &str = "order.requiresAccount";
  pub const TENANT_SLUG: &str = "order.tenantSlug";
  pub const PAYMENT_METHOD_ID: &str = "order.paymentMethodId";
  pub const PAYMENT_STATUS: &str = "order.paymentStatus";
  pub const GATEWAY: &str = "order.gateway";
  pub const GATEWAY_TRANSACTION_ID: &str = "order.gatewayTransactionId";
  pub const PAYMENT_RESPONSE_JSON: &str = "order.paymentResponseJson";
  pub const IDEMPOTENCY_KEY: &str = "order.idempotencyKey";
  pub const USER_ID: &str = "order.userId";

  pub const BILLING_NAME: &str = "billing.name";
  pub const BILLING_EMAIL: &str = "billing.email";
  pub const BILLING_PHONE: &str = "billing.phone";
  pub const BILLING_ADDRESS1: &str = "billing.address1";
  pub const BILLING_ADDRESS2: &str = "billing.address2";
  pub const BILLING_CITY: &str = "billing.city";
  pub const BILLING_STATE: &str = "billing.state";
  pub const BILLING_POSTCODE: &str = "billing.postcode";
  pub const BILLING_COUNTRY: &str = "billing.country";

  pub const SHIPPING_NAME: &str = "shipping.name";
  pub const SHIPPING_PHONE: &str = "shipping.phone";
  pub const SHIPPING_ADDRESS1: &str = "shipping.address1";
  pub const SHIPPING_ADDRESS2: &str = "shipping.address2";
  pub const SHIPPING_CITY: &str = "shipping.city";
  pub const SHIPPING_STATE: &str = "shipping.state";
  pub const SHIPPING_POSTCODE: &str = "shipping.postcode";
  pub const SHIPPING_COUNTRY: &str = "shipping.country";

  pub const LEGACY_PAYLOAD: &str = "order:payload";
  pub const LEGACY_SUBTOTAL: &str = "order:subtotal";
  pub const LEGACY_TOTAL: &str = "order:total";
  pub const LEGACY_EMAIL: &str = "order:email";
  pub const LEGACY_USER_ID: &str = "order:userId";

  /// Recurring billing opened for a subscription order.
  pub const SUBSCRIPTION_ID: &str = "order.subscriptionId";
  pub const SUBSCRIPTION_STATUS: &str = "order.subscription.status";
  pub const SUBSCRIPTION_PRODUCT_ID: &str = "order.subscription.productId";
  pub const SUBSCRIPTION_AMOUNT_MONTHLY: &str = "order.subscription.amountMonthly";
  pub const SUBSCRIPTION_SETUP_FEE: &str = "order.subscription.setupFee";
  pub const SUBSCRIPTION_TRIAL_DAYS: &str = "order.subscription.trialDays";
  pub const SUBSCRIPTION_START_DATE: &str = "order.subscription.startDate";
  pub const SUBSCRIPTION_CUSTOMER_PROFILE_ID: &str = "order.subscription.customerProfileId";
  pub const SUBSCRIPTION_PAYMENT_PROFILE_ID: &str = "order.subscription.customerPaymentProfileId";

  /// Keys an order may lack. A reused order gets them reset to null when
  /// the new submission does not provide them.
  pub const OPTIONAL: &[&str] = &[
    COUPON_CODE,
    DISCOUNT_AMOUNT,
    CUSTOMER_PHONE,
    TENANT_SLUG,
    GATEWAY,
    GATEWAY_TRANSACTION_ID,
    PAYMENT_RESPONSE_JSON,
    USER_ID,
    LEGACY_USER_ID,
    BILLING_NAME,
    BILLING_PHONE,
    BILLING_ADDRESS1,
    BILLING_ADDRESS2,
    BILLING_CITY,
    BILLING_STATE,
    BILLING_POSTCODE,
    BILLING_COUNTRY,
    SHIPPING_NAME,
    SHIPPING_PHONE,
    SHIPPING_ADDRESS1,
    SHIPPING_ADDRESS2,
    SHIPPING_CITY,
    SHIPPING_STATE,
    SHIPPING_POSTCODE,
    SHIPPING_COUNTRY,
    SUBSCRIPTION_ID,
    SUBSCRIPTION_STATUS,
    SUBSCRIPTION_PRODUCT_ID,
    SUBSCRIPTION_AMOUNT_MONTHLY,
    SUBSCRIPTION_SETUP_FEE,
    SUBSCRIPTION_TRIAL_DAYS,
    SUBSCRIPTION_START_DATE,
    SUBSCRIPTION_CUSTOMER_PROFILE_ID,
    SUBSCRIPTION_PAYMENT_PROFILE_ID,
  ];

  /// Prefix of the per-step completion markers written by the checkout saga.
  pub const SAGA_STEP_PREFIX: &str = "order.saga.";

  // Product attributes read during checkout.
  pub const PRODUCT_REQUIRE_ACCOUNT: &str = "product.requireAccount";
  pub const PRODUCT_CRM_TAG_IDS: &str = "crm.marketingTagIdsJson";
  pub const PRODUCT_CRM_TAG_SLUGS: &str = "crm.tagSlugsJson";
  pub const PRODUCT_TYPE: &str = "product.type";
  pub const PRODUCT_SUBSCRIPTION_INTERVAL: &str = "product.subscription.interval";
  /// Whole cents.
  pub const PRODUCT_SUBSCRIPTION_AMOUNT_MONTHLY: &str = "product.subscription.amountMonthly";
  /// Whole cents.
  pub const PRODUCT_SUBSCRIPTION_SETUP_FEE: &str = "product.subscription.setupFee";
  pub const PRODUCT_SUBSCRIPTION_TRIAL_DAYS: &str = "product.subscription.trialDays";
}

const ORDER_NAMESPACES: [&str; 4] = ["order.", "billing.", "shipping.", "order:"];

/// Whether `key` may be stored on an order.
pub fn is_order_key(key: &str) -> bool {
  ORDER_NAMESPACES
    .iter()
    .any(|ns| key.len() > ns.len() && key.starts_with(ns))
}

pub fn saga_marker_key(step_name: &str) -> String {
  format!("{}{}", keys::SAGA_STEP_PREFIX, step_name)
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttributeEntry {
  pub key: String,
  pub value: ScalarValue,
}

/// Ordered list of attribute writes. A later write of the same key wins
/// when the bag is applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeBag {
  entries: Vec<AttributeEntry>,
}

impl AttributeBag {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(&mut self, key: &str, value: impl Into<ScalarValue>) {
    debug_assert!(is_order_key(key), "attribute key '{}' is not namespaced", key);
    self.entries.push(AttributeEntry {
      key: key.to_string(),
      value: value.into(),
    });
  }

  /// Pushes a trimmed string value, skipping absent or blank ones.
  pub fn push_non_empty(&mut self, key: &str, value: Option<&str>) {
    if let Some(v) = value.map(str::trim).filter(|v| !v.is_empty()) {
      self.push(key, v);
    }
  }

  pub fn get(&self, key: &str) -> Option<&ScalarValue> {
    self.entries.iter().rev().find(|e| e.key == key).map(|e| &e.value)
  }

  pub fn contains_key(&self, key: &str) -> bool {
    self.get(key).is_some()
  }

  pub fn iter(&self) -> impl Iterator<Item = &AttributeEntry> {
    self.entries.iter()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Appends a null for every key of `keys` the bag does not set.
  pub fn null_absent(&mut self, keys: &[&str]) {
    for key in keys {
      if !self.contains_key(key) {
        self.push(key, ScalarValue::Null);
      }
    }
  }
}

impl IntoIterator for AttributeBag {
  type Item = AttributeEntry;
  type IntoIter = std::vec::IntoIter<AttributeEntry>;

  fn into_iter(self) -> Self::IntoIter {
    self.entries.into_iter()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use rust_decimal_macros::dec;

  #[test]
  fn every_registered_order_key_is_namespaced() {
    let order_keys = [
      keys::ITEMS_JSON,
      keys::ORDER_STATUS,
      keys::PAYMENT_RESPONSE_JSON,
      keys::BILLING_EMAIL,
      keys::SHIPPING_COUNTRY,
      keys::LEGACY_PAYLOAD,
      keys::LEGACY_USER_ID,
    ];
    for key in order_keys {
      assert!(is_order_key(key), "{} should be accepted", key);
    }
    assert!(is_order_key(&saga_marker_key("settle_payment")));
  }

  #[test]
  fn foreign_or_bare_keys_are_rejected() {
    assert!(!is_order_key("status"));
    assert!(!is_order_key("order."));
    assert!(!is_order_key("product.requireAccount"));
    assert!(!is_order_key("contact.email"));
  }

  #[test]
  fn truthy_flags_follow_loose_rules() {
    assert!(ScalarValue::Bool(true).is_truthy_flag());
    assert!(ScalarValue::from("true").is_truthy_flag());
    assert!(ScalarValue::from("1").is_truthy_flag());
    assert!(ScalarValue::Number(dec!(1)).is_truthy_flag());
    assert!(!ScalarValue::from("yes").is_truthy_flag());
    assert!(!ScalarValue::Null.is_truthy_flag());
  }

  #[test]
  fn later_writes_shadow_earlier_ones() {
    let mut bag = AttributeBag::new();
    bag.push(keys::PAYMENT_STATUS, "pending");
    bag.push(keys::PAYMENT_STATUS, "paid");
    bag.push_non_empty(keys::BILLING_CITY, Some("   "));
    assert_eq!(bag.get(keys::PAYMENT_STATUS), Some(&ScalarValue::from("paid")));
    assert!(!bag.contains_key(keys::BILLING_CITY));
    assert_eq!(bag.len(), 2);
  }

  #[test]
  fn numbers_serialize_as_json_numbers() {
    let json = serde_json::to_string(&ScalarValue::Number(dec!(12.5))).unwrap();
    assert_eq!(json, "12.5");
  }

  #[test]
  fn null_absent_only_fills_unset_optional_keys() {
    assert!(keys::OPTIONAL.iter().all(|k| is_order_key(k)));

    let mut bag = AttributeBag::new();
    bag.push(keys::COUPON_CODE, "SAVE10");
    bag.null_absent(keys::OPTIONAL);

    assert_eq!(bag.get(keys::COUPON_CODE), Some(&ScalarValue::from("SAVE10")));
    assert_eq!(bag.get(keys::SHIPPING_NAME), Some(&ScalarValue::Null));
    assert_eq!(bag.len(), keys::OPTIONAL.len());
  }
}
