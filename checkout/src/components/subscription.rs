// checkout/src/components/subscription.rs

//! Subscription products: reading their terms from the catalog, and opening
//! recurring billing once the first payment is captured.

use crate::components::eligibility::ProductAttributeCache;
use crate::errors::{CheckoutError, Result};
use crate::models::{
  keys, BillingSubset, LineItem, OrderId, PaymentToken, ScalarValue, SubscriptionRequest, TenantId,
};
use crate::services::{OrderRepository, PaymentGateway, ProductAttributes};
use chrono::{Days, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{error, info, instrument};

/// `product.type` of a product billed monthly.
pub const SUBSCRIPTION_PRODUCT_TYPE: &str = "simple_subscription";
const MONTHLY_INTERVAL: &str = "month";
/// Without a trial the first recurring charge comes one period after checkout.
const FIRST_PERIOD_DAYS: u64 = 30;
const MAX_TRIAL_DAYS: u64 = 3650;

/// `order.subscription.status` values.
pub const STATUS_PENDING: &str = "pending";
pub const STATUS_ACTIVE: &str = "active";
pub const STATUS_FAILED: &str = "failed";

/// Billing terms of the one subscription product in a cart. Amounts are in
/// currency units; the catalog stores them in cents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionTerms {
  pub product_id: String,
  pub title: String,
  pub amount_monthly: Decimal,
  pub setup_fee: Decimal,
  pub trial_days: u32,
  /// Date of the first recurring charge.
  pub start_date: NaiveDate,
  /// Charged at checkout: the setup fee, plus the first month when there is no trial.
  pub initial_charge: Decimal,
}

impl SubscriptionTerms {
  /// The cart as it is priced and stored: one line carrying the initial charge.
  pub fn line_items(&self) -> Vec<LineItem> {
    vec![LineItem {
      product_id: self.product_id.clone(),
      title: self.title.clone(),
      unit_price: self.initial_charge,
      quantity: 1,
    }]
  }
}

fn is_subscription(attributes: &ProductAttributes) -> bool {
  attributes
    .get(keys::PRODUCT_TYPE)
    .and_then(ScalarValue::as_str)
    .map_or(false, |t| t.trim() == SUBSCRIPTION_PRODUCT_TYPE)
}

/// Floors a numeric attribute at zero; anything else counts as zero.
fn whole_number(attributes: &ProductAttributes, key: &str) -> Decimal {
  attributes
    .get(key)
    .and_then(ScalarValue::as_decimal)
    .map_or(Decimal::ZERO, |n| n.floor().max(Decimal::ZERO))
}

fn invalid(message: &str) -> CheckoutError {
  CheckoutError::InvalidSubscription(message.to_string())
}

/// Finds the subscription product in the cart, if any, and derives its
/// terms. A subscription must be the only line of its order, bought once.
pub fn detect(
  items: &[LineItem],
  cache: &ProductAttributeCache,
  today: NaiveDate,
) -> Result<Option<SubscriptionTerms>> {
  let Some((item, attributes)) = items
    .iter()
    .find_map(|item| cache.get(&item.product_id).filter(|a| is_subscription(a)).map(|a| (item, a)))
  else {
    return Ok(None);
  };

  if items.len() != 1 {
    return Err(invalid(
      "Subscription checkout currently supports only a single subscription product per order.",
    ));
  }
  if item.quantity != 1 {
    return Err(invalid("Subscription quantity must be 1."));
  }

  let interval = attributes
    .get(keys::PRODUCT_SUBSCRIPTION_INTERVAL)
    .and_then(ScalarValue::as_str)
    .map(str::trim)
    .unwrap_or_default();
  if !interval.is_empty() && interval != MONTHLY_INTERVAL {
    return Err(invalid("Unsupported subscription interval (only monthly is supported)."));
  }

  let amount_monthly = whole_number(attributes, keys::PRODUCT_SUBSCRIPTION_AMOUNT_MONTHLY) / Decimal::ONE_HUNDRED;
  if amount_monthly <= Decimal::ZERO {
    return Err(invalid("Subscription product is missing a valid monthly price."));
  }
  let setup_fee = whole_number(attributes, keys::PRODUCT_SUBSCRIPTION_SETUP_FEE) / Decimal::ONE_HUNDRED;
  let trial_days = whole_number(attributes, keys::PRODUCT_SUBSCRIPTION_TRIAL_DAYS)
    .to_u64()
    .filter(|days| *days <= MAX_TRIAL_DAYS)
    .ok_or_else(|| invalid("Subscription trial is too long."))?;

  let (first_charge_after, initial_charge) = if trial_days > 0 {
    (trial_days, setup_fee)
  } else {
    (FIRST_PERIOD_DAYS, setup_fee + amount_monthly)
  };
  let start_date = today
    .checked_add_days(Days::new(first_charge_after))
    .ok_or_else(|| invalid("Subscription start date is out of range."))?;

  let title = Some(item.title.trim())
    .filter(|t| !t.is_empty())
    .unwrap_or("Subscription")
    .to_string();

  Ok(Some(SubscriptionTerms {
    product_id: item.product_id.clone(),
    title,
    amount_monthly,
    setup_fee,
    trial_days: trial_days as u32,
    start_date,
    initial_charge,
  }))
}

/// Per-order inputs to [`open_recurring_billing`].
pub struct RecurringBilling<'a> {
  pub tenant: &'a TenantId,
  pub order_id: &'a OrderId,
  pub token: &'a PaymentToken,
  pub terms: &'a SubscriptionTerms,
  pub email: &'a str,
  pub currency: &'a str,
  pub billing: BillingSubset,
}

/// Opens recurring billing for a paid subscription order and records it on
/// the order. An order that already carries a subscription id is left alone.
/// A refusal marks the subscription failed on the order and is returned as
/// an error.
#[instrument(
  name = "subscription::open",
  skip(orders, gateway, billing),
  fields(order_id = %billing.order_id, product_id = %billing.terms.product_id)
)]
pub async fn open_recurring_billing(
  orders: &dyn OrderRepository,
  gateway: &dyn PaymentGateway,
  billing: RecurringBilling<'_>,
) -> Result<()> {
  let order_id = billing.order_id;
  let existing = orders.get_attribute(order_id, keys::SUBSCRIPTION_ID).await?;
  if existing.as_ref().and_then(ScalarValue::as_str).is_some() {
    info!("Order already has recurring billing.");
    return Ok(());
  }

  let request = SubscriptionRequest {
    tenant: billing.tenant.clone(),
    order_id: order_id.clone(),
    token: billing.token.clone(),
    email: billing.email.trim().to_string(),
    billing: billing.billing,
    amount_monthly: billing.terms.amount_monthly,
    currency: billing.currency.to_string(),
    start_date: billing.terms.start_date,
  };
  let refusal = match gateway.create_subscription(request).await {
    Ok(outcome) if outcome.success => match outcome.subscription_id {
      Some(subscription_id) => {
        orders
          .set_attribute(order_id, keys::SUBSCRIPTION_ID, subscription_id.as_str().into())
          .await?;
        if let Some(profile) = outcome.customer_profile_id {
          orders
            .set_attribute(order_id, keys::SUBSCRIPTION_CUSTOMER_PROFILE_ID, profile.into())
            .await?;
        }
        if let Some(profile) = outcome.customer_payment_profile_id {
          orders
            .set_attribute(order_id, keys::SUBSCRIPTION_PAYMENT_PROFILE_ID, profile.into())
            .await?;
        }
        orders
          .set_attribute(order_id, keys::SUBSCRIPTION_STATUS, STATUS_ACTIVE.into())
          .await?;
        info!(%subscription_id, start_date = %billing.terms.start_date, "Recurring billing opened.");
        return Ok(());
      }
      None => "gateway did not return a subscription id".to_string(),
    },
    Ok(outcome) => outcome
      .error_message
      .unwrap_or_else(|| "Unable to create subscription".to_string()),
    Err(e) => e.to_string(),
  };

  error!(reason = %refusal, "Recurring billing could not be opened; order left for reconciliation.");
  orders
    .set_attribute(order_id, keys::SUBSCRIPTION_STATUS, STATUS_FAILED.into())
    .await?;
  Err(CheckoutError::Service {
    source: anyhow::anyhow!("recurring billing for order {} was not opened: {}", order_id, refusal),
  })
}
