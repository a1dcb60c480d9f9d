// checkout/src/services/orders.rs

//! Order header + attribute storage contract and an in-memory implementation.

use crate::models::attributes::is_order_key;
use crate::models::{OrderDraft, OrderHeader, OrderId, OrderStatus, ScalarValue, TenantId, ORDER_RECORD_KIND};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;
use tracing::{debug, instrument};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum OrderStoreError {
  /// Another order that has not failed already holds this key for the tenant.
  #[error("Idempotency key '{key}' is already held by order {existing}")]
  IdempotencyConflict { key: String, existing: OrderId },

  #[error(transparent)]
  Backend(#[from] anyhow::Error),
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
  /// Creates an `unpaid` header. When the draft carries an idempotency key,
  /// the store refuses a second live order for the same `(tenant, key)`.
  /// A draft naming an attempt is created with that attempt holding its
  /// settlement lease.
  async fn create_order(&self, draft: OrderDraft) -> Result<OrderId, OrderStoreError>;

  /// Atomically takes or renews the settlement lease of an `unpaid` order
  /// for `attempt`. Succeeds when the lease is free, already held by
  /// `attempt`, or was last taken at least `lease` before `now`; returns
  /// `false` when another attempt holds it or the order is no longer unpaid.
  async fn acquire_settlement_lease(
    &self,
    id: &OrderId,
    attempt: &str,
    now: DateTime<Utc>,
    lease: Duration,
  ) -> anyhow::Result<bool>;

  /// Overwrites by key.
  async fn set_attribute(&self, id: &OrderId, key: &str, value: ScalarValue) -> anyhow::Result<()>;

  async fn get_attribute(&self, id: &OrderId, key: &str) -> anyhow::Result<Option<ScalarValue>>;

  async fn patch_status(&self, id: &OrderId, status: OrderStatus) -> anyhow::Result<()>;

  /// Orders of the tenant whose attribute `key` equals `value`, oldest first.
  async fn find_orders_by_attribute(
    &self,
    tenant: &TenantId,
    key: &str,
    value: &ScalarValue,
  ) -> anyhow::Result<Vec<OrderHeader>>;
}

#[derive(Debug, Clone)]
struct StoredOrder {
  header: OrderHeader,
  attributes: BTreeMap<String, ScalarValue>,
  lease: Option<SettlementLease>,
}

#[derive(Debug, Clone)]
struct SettlementLease {
  holder: String,
  taken_at: DateTime<Utc>,
}

#[derive(Default)]
struct OrderTables {
  orders: Vec<StoredOrder>,
  claims: HashMap<(TenantId, String), OrderId>,
}

impl OrderTables {
  fn find_mut(&mut self, id: &OrderId) -> anyhow::Result<&mut StoredOrder> {
    self
      .orders
      .iter_mut()
      .find(|o| &o.header.id == id)
      .ok_or_else(|| anyhow::anyhow!("order {} not found", id))
  }

  fn find(&self, id: &OrderId) -> Option<&StoredOrder> {
    self.orders.iter().find(|o| &o.header.id == id)
  }
}

#[derive(Default)]
pub struct InMemoryOrderRepository {
  tables: RwLock<OrderTables>,
}

impl InMemoryOrderRepository {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn order_count(&self) -> usize {
    self.tables.read().orders.len()
  }

  pub fn header(&self, id: &OrderId) -> Option<OrderHeader> {
    self.tables.read().find(id).map(|o| o.header.clone())
  }

  pub fn attributes(&self, id: &OrderId) -> BTreeMap<String, ScalarValue> {
    self.tables.read().find(id).map(|o| o.attributes.clone()).unwrap_or_default()
  }

  pub fn attribute(&self, id: &OrderId, key: &str) -> Option<ScalarValue> {
    self.tables.read().find(id).and_then(|o| o.attributes.get(key).cloned())
  }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
  #[instrument(name = "order_store::create", skip(self, draft), fields(tenant = %draft.tenant, slug = %draft.slug))]
  async fn create_order(&self, draft: OrderDraft) -> Result<OrderId, OrderStoreError> {
    let mut tables = self.tables.write();

    let claim = draft.idempotency_key.clone().map(|key| (draft.tenant.clone(), key));
    if let Some(claim_key) = &claim {
      if let Some(existing) = tables.claims.get(claim_key) {
        let live = tables
          .find(existing)
          .map_or(false, |o| o.header.status != OrderStatus::Failed);
        if live {
          return Err(OrderStoreError::IdempotencyConflict {
            key: claim_key.1.clone(),
            existing: existing.clone(),
          });
        }
      }
    }

    let id = OrderId::new(format!("ord_{}", Uuid::new_v4().simple()));
    let lease = draft.attempt.map(|holder| SettlementLease {
      holder,
      taken_at: draft.created_at,
    });
    tables.orders.push(StoredOrder {
      header: OrderHeader {
        id: id.clone(),
        tenant: draft.tenant,
        kind: ORDER_RECORD_KIND.to_string(),
        title: draft.title,
        slug: draft.slug,
        status: OrderStatus::Unpaid,
        created_at: draft.created_at,
      },
      attributes: BTreeMap::new(),
      lease,
    });
    if let Some(claim_key) = claim {
      tables.claims.insert(claim_key, id.clone());
    }
    debug!(order_id = %id, "Order header created.");
    Ok(id)
  }

  #[instrument(name = "order_store::acquire_lease", skip(self, now, lease), fields(order_id = %id))]
  async fn acquire_settlement_lease(
    &self,
    id: &OrderId,
    attempt: &str,
    now: DateTime<Utc>,
    lease: Duration,
  ) -> anyhow::Result<bool> {
    let mut tables = self.tables.write();
    let order = tables.find_mut(id)?;
    if order.header.status != OrderStatus::Unpaid {
      return Ok(false);
    }
    let free = match &order.lease {
      None => true,
      Some(held) => held.holder == attempt || now - held.taken_at >= lease,
    };
    if !free {
      debug!("Settlement lease held by another attempt.");
      return Ok(false);
    }
    order.lease = Some(SettlementLease {
      holder: attempt.to_string(),
      taken_at: now,
    });
    Ok(true)
  }

  async fn set_attribute(&self, id: &OrderId, key: &str, value: ScalarValue) -> anyhow::Result<()> {
    if !is_order_key(key) {
      anyhow::bail!("attribute key '{}' is outside the order namespaces", key);
    }
    let mut tables = self.tables.write();
    tables.find_mut(id)?.attributes.insert(key.to_string(), value);
    Ok(())
  }

  async fn get_attribute(&self, id: &OrderId, key: &str) -> anyhow::Result<Option<ScalarValue>> {
    Ok(self.attribute(id, key))
  }

  async fn patch_status(&self, id: &OrderId, status: OrderStatus) -> anyhow::Result<()> {
    let mut tables = self.tables.write();
    let order = tables.find_mut(id)?;
    let current = order.header.status;
    if current.is_terminal() && current != status {
      anyhow::bail!("order {} is already {} and cannot become {}", id, current, status);
    }
    order.header.status = status;
    Ok(())
  }

  async fn find_orders_by_attribute(
    &self,
    tenant: &TenantId,
    key: &str,
    value: &ScalarValue,
  ) -> anyhow::Result<Vec<OrderHeader>> {
    let tables = self.tables.read();
    Ok(
      tables
        .orders
        .iter()
        .filter(|o| &o.header.tenant == tenant && o.header.kind == ORDER_RECORD_KIND)
        .filter(|o| o.attributes.get(key) == Some(value))
        .map(|o| o.header.clone())
        .collect(),
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Utc;

  fn draft(key: Option<&str>) -> OrderDraft {
    OrderDraft::at(TenantId::new("t1"), Utc::now(), key.map(str::to_string))
  }

  #[tokio::test]
  async fn second_live_order_for_same_key_is_rejected() {
    let repo = InMemoryOrderRepository::new();
    let first = repo.create_order(draft(Some("k1"))).await.unwrap();
    match repo.create_order(draft(Some("k1"))).await {
      Err(OrderStoreError::IdempotencyConflict { existing, .. }) => assert_eq!(existing, first),
      other => panic!("expected conflict, got {:?}", other),
    }
    assert!(repo.create_order(draft(None)).await.is_ok());
  }

  #[tokio::test]
  async fn failed_order_releases_its_key() {
    let repo = InMemoryOrderRepository::new();
    let first = repo.create_order(draft(Some("k1"))).await.unwrap();
    repo.patch_status(&first, OrderStatus::Failed).await.unwrap();
    let second = repo.create_order(draft(Some("k1"))).await.unwrap();
    assert_ne!(first, second);
  }

  #[tokio::test]
  async fn terminal_status_is_final() {
    let repo = InMemoryOrderRepository::new();
    let id = repo.create_order(draft(None)).await.unwrap();
    repo.patch_status(&id, OrderStatus::Paid).await.unwrap();
    repo.patch_status(&id, OrderStatus::Paid).await.unwrap();
    assert!(repo.patch_status(&id, OrderStatus::Failed).await.is_err());
  }

  #[tokio::test]
  async fn settlement_lease_has_one_holder_until_it_goes_stale() {
    let repo = InMemoryOrderRepository::new();
    let created = Utc::now() - Duration::minutes(10);
    let id = repo
      .create_order(OrderDraft::at(TenantId::new("t1"), created, None).held_by("first"))
      .await
      .unwrap();
    let lease = Duration::seconds(120);
    let now = Utc::now();

    assert!(repo.acquire_settlement_lease(&id, "second", now, lease).await.unwrap());
    assert!(!repo.acquire_settlement_lease(&id, "third", now, lease).await.unwrap());
    assert!(!repo.acquire_settlement_lease(&id, "first", now, lease).await.unwrap());
    assert!(repo.acquire_settlement_lease(&id, "second", now, lease).await.unwrap());
    assert!(repo
      .acquire_settlement_lease(&id, "third", now + Duration::seconds(121), lease)
      .await
      .unwrap());

    repo.patch_status(&id, OrderStatus::Paid).await.unwrap();
    assert!(!repo
      .acquire_settlement_lease(&id, "third", now + Duration::seconds(121), lease)
      .await
      .unwrap());
  }

  #[tokio::test]
  async fn non_namespaced_keys_are_refused() {
    let repo = InMemoryOrderRepository::new();
    let id = repo.create_order(draft(None)).await.unwrap();
    assert!(repo.set_attribute(&id, "total", ScalarValue::Null).await.is_err());
    assert!(repo.set_attribute(&id, "order.total", ScalarValue::Null).await.is_ok());
  }
}
