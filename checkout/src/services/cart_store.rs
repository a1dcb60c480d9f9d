// checkout/src/services/cart_store.rs

//! Cart storage contract and an in-memory implementation.

use crate::models::{CartOwner, CartRow};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::{debug, instrument};

#[async_trait]
pub trait CartStore: Send + Sync {
  async fn get_cart(&self, owner: &CartOwner) -> anyhow::Result<Vec<CartRow>>;

  /// Moves the guest session's rows into the user's cart.
  async fn merge_guest_into_user(&self, user_id: &str, guest_session_id: &str) -> anyhow::Result<()>;

  async fn clear_cart(&self, owner: &CartOwner) -> anyhow::Result<()>;
}

#[derive(Default)]
pub struct InMemoryCartStore {
  carts: RwLock<HashMap<CartOwner, Vec<CartRow>>>,
  fail_clear: AtomicBool,
  clear_calls: AtomicUsize,
}

impl InMemoryCartStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn put(&self, owner: CartOwner, rows: Vec<CartRow>) {
    self.carts.write().insert(owner, rows);
  }

  pub fn rows(&self, owner: &CartOwner) -> Vec<CartRow> {
    self.carts.read().get(owner).cloned().unwrap_or_default()
  }

  pub fn fail_clear(&self, fail: bool) {
    self.fail_clear.store(fail, Ordering::SeqCst);
  }

  pub fn clear_calls(&self) -> usize {
    self.clear_calls.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl CartStore for InMemoryCartStore {
  async fn get_cart(&self, owner: &CartOwner) -> anyhow::Result<Vec<CartRow>> {
    Ok(self.rows(owner))
  }

  #[instrument(name = "cart_store::merge", skip(self))]
  async fn merge_guest_into_user(&self, user_id: &str, guest_session_id: &str) -> anyhow::Result<()> {
    let mut carts = self.carts.write();
    let guest_rows = carts
      .remove(&CartOwner::Guest(guest_session_id.to_string()))
      .unwrap_or_default();
    if guest_rows.is_empty() {
      return Ok(());
    }
    debug!(moved = guest_rows.len(), "Merging guest cart rows into user cart.");
    let user_rows = carts.entry(CartOwner::User(user_id.to_string())).or_default();
    for row in guest_rows {
      let existing = user_rows
        .iter_mut()
        .find(|r| r.product_id.is_some() && r.product_id == row.product_id);
      match existing {
        Some(r) => r.quantity += row.quantity,
        None => user_rows.push(row),
      }
    }
    Ok(())
  }

  async fn clear_cart(&self, owner: &CartOwner) -> anyhow::Result<()> {
    self.clear_calls.fetch_add(1, Ordering::SeqCst);
    if self.fail_clear.load(Ordering::SeqCst) {
      anyhow::bail!("cart store unavailable while clearing {}", owner);
    }
    self.carts.write().remove(owner);
    Ok(())
  }
}
