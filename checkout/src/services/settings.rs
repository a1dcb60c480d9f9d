// checkout/src/services/settings.rs

//! Tenant-scoped options.

use crate::models::TenantId;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

pub const ECOMMERCE_SETTINGS_OPTION: &str = "plugin.ecommerce.settings";
pub const CRM_ENABLED_OPTION: &str = "plugin_crm_enabled";

#[async_trait]
pub trait SettingsStore: Send + Sync {
  async fn get_option(&self, tenant: &TenantId, key: &str) -> anyhow::Result<Option<serde_json::Value>>;

  async fn tenant_slug(&self, tenant: &TenantId) -> anyhow::Result<Option<String>>;
}

#[derive(Default)]
pub struct InMemorySettings {
  options: RwLock<HashMap<(TenantId, String), serde_json::Value>>,
  slugs: RwLock<HashMap<TenantId, String>>,
}

impl InMemorySettings {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn set_option(&self, tenant: &TenantId, key: &str, value: serde_json::Value) {
    self.options.write().insert((tenant.clone(), key.to_string()), value);
  }

  pub fn set_tenant_slug(&self, tenant: &TenantId, slug: &str) {
    self.slugs.write().insert(tenant.clone(), slug.to_string());
  }
}

#[async_trait]
impl SettingsStore for InMemorySettings {
  async fn get_option(&self, tenant: &TenantId, key: &str) -> anyhow::Result<Option<serde_json::Value>> {
    Ok(self.options.read().get(&(tenant.clone(), key.to_string())).cloned())
  }

  async fn tenant_slug(&self, tenant: &TenantId) -> anyhow::Result<Option<String>> {
    Ok(self.slugs.read().get(tenant).cloned())
  }
}
