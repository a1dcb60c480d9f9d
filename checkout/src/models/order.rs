// checkout/src/models/order.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Record kind under which orders are stored in the post store.
pub const ORDER_RECORD_KIND: &str = "orders";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
  pub fn new(id: impl Into<String>) -> Self {
    OrderId(id.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for OrderId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
  pub fn new(id: impl Into<String>) -> Self {
    TenantId(id.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for TenantId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Header status. `Unpaid` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
  Unpaid,
  Paid,
  Failed,
}

impl OrderStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      OrderStatus::Unpaid => "unpaid",
      OrderStatus::Paid => "paid",
      OrderStatus::Failed => "failed",
    }
  }

  pub fn is_terminal(&self) -> bool {
    !matches!(self, OrderStatus::Unpaid)
  }
}

impl fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// What the order store needs to create a draft header.
#[derive(Debug, Clone)]
pub struct OrderDraft {
  pub tenant: TenantId,
  pub title: String,
  pub slug: String,
  pub created_at: DateTime<Utc>,
  /// Held by the store as a uniqueness claim while the order is not failed.
  pub idempotency_key: Option<String>,
  /// Checkout attempt that holds the order's settlement lease from creation.
  pub attempt: Option<String>,
}

impl OrderDraft {
  /// Title and slug are derived from the creation time in epoch milliseconds.
  pub fn at(tenant: TenantId, now: DateTime<Utc>, idempotency_key: Option<String>) -> Self {
    let millis = now.timestamp_millis();
    Self {
      tenant,
      title: format!("Order {}", millis),
      slug: format!("order-{}", millis),
      created_at: now,
      idempotency_key,
      attempt: None,
    }
  }

  pub fn held_by(mut self, attempt: impl Into<String>) -> Self {
    self.attempt = Some(attempt.into());
    self
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderHeader {
  pub id: OrderId,
  pub tenant: TenantId,
  pub kind: String,
  pub title: String,
  pub slug: String,
  pub status: OrderStatus,
  pub created_at: DateTime<Utc>,
}
