// checkout/src/components/cart.rs

//! Reads the buyer's cart into priced line items, and empties it once the
//! order has been paid.

use crate::errors::{CheckoutError, Result};
use crate::models::{CartIdentity, CartRow, LineItem};
use crate::services::CartStore;
use rust_decimal::Decimal;
use tracing::{debug, instrument, warn};

const DEFAULT_TITLE: &str = "Product";

/// Drops rows without a product id and floors quantities to at least one.
/// Prices are kept as the cart captured them.
pub fn normalize_rows(rows: Vec<CartRow>) -> Vec<LineItem> {
  rows
    .into_iter()
    .filter_map(|row| {
      let product_id = row.product_id.map(|p| p.trim().to_string()).filter(|p| !p.is_empty())?;
      let title = row
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| DEFAULT_TITLE.to_string());
      Some(LineItem {
        product_id,
        title,
        unit_price: row.unit_price.unwrap_or(Decimal::ZERO),
        quantity: floor_quantity(row.quantity),
      })
    })
    .collect()
}

fn floor_quantity(raw: f64) -> u32 {
  if !raw.is_finite() || raw < 1.0 {
    return 1;
  }
  // `as` saturates at u32::MAX.
  raw.floor() as u32
}

/// Distinct product ids in first-seen order.
pub fn unique_product_ids(items: &[LineItem]) -> Vec<String> {
  let mut ids: Vec<String> = Vec::with_capacity(items.len());
  for item in items {
    if !ids.contains(&item.product_id) {
      ids.push(item.product_id.clone());
    }
  }
  ids
}

#[instrument(name = "cart::load_snapshot", skip(carts, identity), fields(owner = %identity.snapshot_owner()))]
pub async fn load_snapshot(carts: &dyn CartStore, identity: &CartIdentity) -> Result<Vec<LineItem>> {
  if let Some((user_id, guest_session_id)) = identity.guest_to_merge() {
    carts.merge_guest_into_user(user_id, guest_session_id).await?;
  }

  let rows = carts.get_cart(identity.snapshot_owner()).await?;
  let row_count = rows.len();
  let items = normalize_rows(rows);
  if items.len() < row_count {
    warn!(dropped = row_count - items.len(), "Dropped cart rows without a product id.");
  }
  if items.is_empty() {
    return Err(CheckoutError::CartEmpty);
  }
  debug!(line_items = items.len(), "Cart snapshot loaded.");
  Ok(items)
}

/// Empties every cart the checkout drew from. Stops at the first failure.
#[instrument(name = "cart::clear", skip(carts, identity))]
pub async fn clear_carts(carts: &dyn CartStore, identity: &CartIdentity) -> anyhow::Result<()> {
  for owner in identity.owners() {
    carts.clear_cart(&owner).await?;
    debug!(%owner, "Cart cleared.");
  }
  Ok(())
}
