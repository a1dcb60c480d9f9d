// checkout/src/components/eligibility.rs

//! Account-required product policy, and the per-checkout product attribute cache.

use crate::errors::{CheckoutError, Result};
use crate::models::{keys, TenantId};
use crate::services::{ProductAttributes, ProductCatalog};
use std::collections::HashMap;
use tracing::{info, instrument};

/// Product attributes already read during this checkout, by product id.
pub type ProductAttributeCache = HashMap<String, ProductAttributes>;

/// Reads the attributes of every product not yet in `cache`.
#[instrument(name = "eligibility::fill_cache", skip_all, fields(tenant = %tenant, products = product_ids.len()))]
pub async fn fill_attribute_cache(
  catalog: &dyn ProductCatalog,
  tenant: &TenantId,
  product_ids: &[String],
  cache: &mut ProductAttributeCache,
) -> Result<()> {
  for product_id in product_ids {
    if cache.contains_key(product_id) {
      continue;
    }
    let attributes = catalog.product_attributes(tenant, product_id).await?;
    cache.insert(product_id.clone(), attributes);
  }
  Ok(())
}

pub fn requires_account(product_ids: &[String], cache: &ProductAttributeCache) -> bool {
  product_ids.iter().any(|id| {
    cache
      .get(id)
      .and_then(|attrs| attrs.get(keys::PRODUCT_REQUIRE_ACCOUNT))
      .map_or(false, |v| v.is_truthy_flag())
  })
}

/// Fails when the cart needs an account and the buyer has none.
pub fn enforce(requires_account: bool, user_id: Option<&str>) -> Result<()> {
  if requires_account && user_id.is_none() {
    info!("Guest checkout refused: cart contains an account-required product.");
    return Err(CheckoutError::AccountRequired);
  }
  Ok(())
}
