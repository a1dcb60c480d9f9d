// checkout/src/components/idempotency.rs

//! Looks up an earlier order placed with the same idempotency key.

use crate::components::order_store;
use crate::errors::{CheckoutError, Result};
use crate::models::{keys, OrderHeader, OrderId, OrderStatus, ScalarValue, TenantId};
use crate::services::OrderRepository;
use chrono::{DateTime, Duration, Utc};
use tracing::{info, instrument};

/// What an earlier attempt with the same key left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PriorOrder {
  /// No usable earlier order: place a new one.
  None,
  /// The earlier order is paid: answer with it, charge nothing.
  Replay(OrderId),
  /// The earlier order was abandoned before payment resolved: reuse it.
  Resume(OrderId),
}

impl PriorOrder {
  pub fn is_replay(&self) -> bool {
    matches!(self, PriorOrder::Replay(_))
  }

  pub fn order_id(&self) -> Option<&OrderId> {
    match self {
      PriorOrder::None => None,
      PriorOrder::Replay(id) | PriorOrder::Resume(id) => Some(id),
    }
  }
}

/// Classifies the orders carrying `key`:
/// a paid one is replayed; an unpaid one older than `resume_after` is
/// resumed, a younger one is still in flight and the submission is a
/// duplicate; failed ones are ignored so the buyer can try again.
///
/// Resuming takes the order's settlement lease for `attempt` first. Of
/// several submissions racing to resume the same order, only the one that
/// gets the lease proceeds; the others are duplicates.
#[instrument(name = "idempotency::resolve_existing", skip(orders, now, resume_after), fields(tenant = %tenant))]
pub async fn resolve_existing(
  orders: &dyn OrderRepository,
  tenant: &TenantId,
  key: Option<&str>,
  attempt: &str,
  now: DateTime<Utc>,
  resume_after: Duration,
) -> Result<PriorOrder> {
  let Some(key) = key else {
    return Ok(PriorOrder::None);
  };

  let matches = orders
    .find_orders_by_attribute(tenant, keys::IDEMPOTENCY_KEY, &ScalarValue::from(key))
    .await?;
  let prior = classify(&matches, now, resume_after)?;
  if let PriorOrder::Resume(order_id) = &prior {
    order_store::take_settlement_lease(orders, order_id, attempt, now, resume_after).await?;
  }
  if prior != PriorOrder::None {
    info!(?prior, "Earlier order found for idempotency key.");
  }
  Ok(prior)
}

fn classify(matches: &[OrderHeader], now: DateTime<Utc>, resume_after: Duration) -> Result<PriorOrder> {
  if let Some(paid) = matches.iter().find(|o| o.status == OrderStatus::Paid) {
    return Ok(PriorOrder::Replay(paid.id.clone()));
  }
  match matches
    .iter()
    .filter(|o| o.status == OrderStatus::Unpaid)
    .max_by_key(|o| o.created_at)
  {
    Some(unpaid) if now - unpaid.created_at >= resume_after => Ok(PriorOrder::Resume(unpaid.id.clone())),
    Some(_) => Err(CheckoutError::DuplicateSubmission),
    None => Ok(PriorOrder::None),
  }
}
