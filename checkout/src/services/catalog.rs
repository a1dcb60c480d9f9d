// checkout/src/services/catalog.rs

//! Product attribute lookups.

use crate::models::{ScalarValue, TenantId};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

pub type ProductAttributes = HashMap<String, ScalarValue>;

#[async_trait]
pub trait ProductCatalog: Send + Sync {
  /// All attributes of a product; empty when the product has none or is unknown.
  async fn product_attributes(&self, tenant: &TenantId, product_id: &str) -> anyhow::Result<ProductAttributes>;
}

#[derive(Default)]
pub struct InMemoryCatalog {
  products: RwLock<HashMap<String, ProductAttributes>>,
  reads: AtomicUsize,
}

impl InMemoryCatalog {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn set_attribute(&self, product_id: &str, key: &str, value: impl Into<ScalarValue>) {
    self
      .products
      .write()
      .entry(product_id.to_string())
      .or_default()
      .insert(key.to_string(), value.into());
  }

  pub fn reads(&self) -> usize {
    self.reads.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl ProductCatalog for InMemoryCatalog {
  async fn product_attributes(&self, _tenant: &TenantId, product_id: &str) -> anyhow::Result<ProductAttributes> {
    self.reads.fetch_add(1, Ordering::SeqCst);
    Ok(self.products.read().get(product_id).cloned().unwrap_or_default())
  }
}
