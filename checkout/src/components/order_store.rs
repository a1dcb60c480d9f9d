// checkout/src/components/order_store.rs

//! Order header creation, the attribute set written for each order, and
//! status alignment.

use crate::components::payment::SettlementPlan;
use crate::components::pricing::PricedOrder;
use crate::components::subscription;
use crate::errors::{CheckoutError, Result};
use crate::models::{
  keys, Address, AttributeBag, BillingAddress, FulfillmentStatus, LineItem, OrderDraft, OrderId, OrderStatus,
  PaymentMethod, PaymentStatus, ScalarValue, TenantId,
};
use crate::services::{OrderRepository, OrderStoreError};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

#[instrument(name = "order_store::create_draft", skip(orders, now), fields(tenant = %tenant))]
pub async fn create_draft(
  orders: &dyn OrderRepository,
  tenant: &TenantId,
  now: DateTime<Utc>,
  idempotency_key: Option<&str>,
  attempt: &str,
) -> Result<OrderId> {
  let draft = OrderDraft::at(tenant.clone(), now, idempotency_key.map(str::to_string)).held_by(attempt);
  match orders.create_order(draft).await {
    Ok(id) => {
      // Written right away so the guard can find a draft abandoned before its attributes.
      if let Some(key) = idempotency_key {
        orders.set_attribute(&id, keys::IDEMPOTENCY_KEY, key.into()).await?;
      }
      info!(order_id = %id, "Draft order created (unpaid).");
      Ok(id)
    }
    Err(OrderStoreError::IdempotencyConflict { existing, .. }) => {
      warn!(existing_order = %existing, "Idempotency key already held by a live order.");
      Err(CheckoutError::DuplicateSubmission)
    }
    Err(OrderStoreError::Backend(source)) => Err(CheckoutError::Service { source }),
  }
}

/// Takes or renews the order's settlement lease for `attempt`. Losing it
/// means another submission is working on the order.
#[instrument(name = "order_store::take_settlement_lease", skip(orders, now, lease), fields(order_id = %order_id))]
pub async fn take_settlement_lease(
  orders: &dyn OrderRepository,
  order_id: &OrderId,
  attempt: &str,
  now: DateTime<Utc>,
  lease: Duration,
) -> Result<()> {
  if orders.acquire_settlement_lease(order_id, attempt, now, lease).await? {
    debug!("Settlement lease held.");
    return Ok(());
  }
  warn!("Order is being settled by another submission.");
  Err(CheckoutError::DuplicateSubmission)
}

/// One attribute write per entry, in order.
#[instrument(name = "order_store::write_attributes", skip(orders, bag), fields(order_id = %order_id, entries = bag.len()))]
pub async fn write_attributes(orders: &dyn OrderRepository, order_id: &OrderId, bag: AttributeBag) -> Result<()> {
  for entry in bag {
    orders.set_attribute(order_id, &entry.key, entry.value).await?;
  }
  Ok(())
}

pub async fn set_status(orders: &dyn OrderRepository, order_id: &OrderId, status: OrderStatus) -> Result<()> {
  orders.patch_status(order_id, status).await?;
  info!(order_id = %order_id, status = %status, "Order header status updated.");
  Ok(())
}

/// The snapshot stored in `order.itemsJson`, read back when a paid order is replayed.
pub async fn load_line_items(orders: &dyn OrderRepository, order_id: &OrderId) -> Result<Vec<LineItem>> {
  let raw = orders.get_attribute(order_id, keys::ITEMS_JSON).await?;
  let Some(json) = raw.as_ref().and_then(ScalarValue::as_str) else {
    debug!(order_id = %order_id, "Order has no item snapshot.");
    return Ok(Vec::new());
  };
  serde_json::from_str(json).map_err(|e| CheckoutError::Service {
    source: anyhow::Error::new(e).context(format!("order {} has a malformed item snapshot", order_id)),
  })
}

/// Everything known about the order once pricing and payment planning are done.
pub struct OrderFacts<'a> {
  pub items: &'a [LineItem],
  pub pricing: &'a PricedOrder,
  pub currency: &'a str,
  pub method: PaymentMethod,
  pub plan: &'a SettlementPlan,
  pub idempotency_key: Option<&'a str>,
  pub email: &'a str,
  pub user_id: Option<&'a str>,
  pub billing: &'a BillingAddress,
  pub shipping: &'a Address,
  pub requires_account: bool,
  pub tenant_slug: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LegacyPayload<'a> {
  customer_info: LegacyCustomerInfo<'a>,
  items: &'a [LineItem],
  currency: &'a str,
  totals: LegacyTotals,
}

#[derive(Serialize)]
struct LegacyCustomerInfo<'a> {
  email: &'a str,
  billing: &'a BillingAddress,
  shipping: &'a Address,
}

#[derive(Serialize)]
struct LegacyTotals {
  #[serde(with = "rust_decimal::serde::float")]
  subtotal: Decimal,
  #[serde(with = "rust_decimal::serde::float")]
  total: Decimal,
}

/// The full attribute set of a freshly placed order.
pub fn build_attribute_bag(facts: &OrderFacts<'_>) -> Result<AttributeBag> {
  let email = facts.email.trim();
  let mut bag = AttributeBag::new();

  bag.push(keys::ITEMS_JSON, to_json(facts.items)?);
  bag.push(keys::ITEMS_SUBTOTAL, facts.pricing.subtotal);
  bag.push(keys::ORDER_TOTAL, facts.pricing.total);
  bag.push(keys::CURRENCY, facts.currency);
  if let Some(code) = &facts.pricing.applied_code {
    bag.push(keys::COUPON_CODE, code.as_str());
    bag.push(keys::DISCOUNT_AMOUNT, facts.pricing.discount);
  }
  if let Some(key) = facts.idempotency_key {
    bag.push(keys::IDEMPOTENCY_KEY, key);
  }

  let (payment_status, order_status) = initial_statuses(facts.plan);
  bag.push(keys::PAYMENT_METHOD_ID, facts.method.id());
  bag.push(keys::PAYMENT_STATUS, payment_status.as_str());
  bag.push(keys::ORDER_STATUS, order_status.as_str());
  bag.push(keys::CUSTOMER_EMAIL, email);
  bag.push(keys::SECONDARY_EMAIL_CANDIDATE, email);
  bag.push(keys::REQUIRES_ACCOUNT, facts.requires_account);
  bag.push_non_empty(keys::TENANT_SLUG, facts.tenant_slug);
  bag.push_non_empty(
    keys::CUSTOMER_PHONE,
    facts.billing.address.phone().or_else(|| facts.shipping.phone()),
  );

  let billing = &facts.billing.address;
  bag.push_non_empty(keys::BILLING_NAME, billing.name.as_deref());
  bag.push(keys::BILLING_EMAIL, facts.billing.email().unwrap_or(email));
  bag.push_non_empty(keys::BILLING_PHONE, billing.phone.as_deref());
  bag.push_non_empty(keys::BILLING_ADDRESS1, billing.address1.as_deref());
  bag.push_non_empty(keys::BILLING_ADDRESS2, billing.address2.as_deref());
  bag.push_non_empty(keys::BILLING_CITY, billing.city.as_deref());
  bag.push_non_empty(keys::BILLING_STATE, billing.state.as_deref());
  bag.push_non_empty(keys::BILLING_POSTCODE, billing.postcode.as_deref());
  bag.push_non_empty(keys::BILLING_COUNTRY, billing.country.as_deref());

  let shipping = facts.shipping;
  bag.push_non_empty(keys::SHIPPING_NAME, shipping.name.as_deref());
  bag.push_non_empty(keys::SHIPPING_PHONE, shipping.phone.as_deref());
  bag.push_non_empty(keys::SHIPPING_ADDRESS1, shipping.address1.as_deref());
  bag.push_non_empty(keys::SHIPPING_ADDRESS2, shipping.address2.as_deref());
  bag.push_non_empty(keys::SHIPPING_CITY, shipping.city.as_deref());
  bag.push_non_empty(keys::SHIPPING_STATE, shipping.state.as_deref());
  bag.push_non_empty(keys::SHIPPING_POSTCODE, shipping.postcode.as_deref());
  bag.push_non_empty(keys::SHIPPING_COUNTRY, shipping.country.as_deref());

  if let Some((terms, _)) = facts.plan.subscription() {
    bag.push(keys::SUBSCRIPTION_STATUS, subscription::STATUS_PENDING);
    bag.push(keys::SUBSCRIPTION_PRODUCT_ID, terms.product_id.as_str());
    bag.push(keys::SUBSCRIPTION_AMOUNT_MONTHLY, terms.amount_monthly);
    bag.push(keys::SUBSCRIPTION_SETUP_FEE, terms.setup_fee);
    bag.push(keys::SUBSCRIPTION_TRIAL_DAYS, Decimal::from(terms.trial_days));
    bag.push(keys::SUBSCRIPTION_START_DATE, terms.start_date.to_string());
  }

  bag.push(keys::LEGACY_EMAIL, email);
  if let Some(user_id) = facts.user_id {
    bag.push(keys::LEGACY_USER_ID, user_id);
    bag.push(keys::USER_ID, user_id);
  }
  bag.push(keys::LEGACY_SUBTOTAL, facts.pricing.subtotal);
  bag.push(keys::LEGACY_TOTAL, facts.pricing.total);
  let payload = LegacyPayload {
    customer_info: LegacyCustomerInfo {
      email,
      billing: facts.billing,
      shipping: facts.shipping,
    },
    items: facts.items,
    currency: facts.currency,
    totals: LegacyTotals {
      subtotal: facts.pricing.subtotal,
      total: facts.pricing.total,
    },
  };
  bag.push(keys::LEGACY_PAYLOAD, to_json(&payload)?);

  Ok(bag)
}

/// `order.paymentStatus` / `order.status` written before settlement.
pub fn initial_statuses(plan: &SettlementPlan) -> (PaymentStatus, FulfillmentStatus) {
  match plan.charge() {
    None => (PaymentStatus::Paid, FulfillmentStatus::Processing),
    Some(_) => (PaymentStatus::Pending, FulfillmentStatus::Pending),
  }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
  serde_json::to_string(value).map_err(|e| CheckoutError::Service {
    source: anyhow::Error::new(e).context("serializing order attribute"),
  })
}
