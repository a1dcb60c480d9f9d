// checkout/src/state.rs
use crate::config::AppConfig;
use crate::services::{
  CartStore, CrmClient, DiscountValidator, FunnelStore, InMemoryCartStore, InMemoryCatalog, InMemoryCrm,
  InMemoryDiscountValidator, InMemoryFunnels, InMemoryOrderRepository, InMemorySettings, MockPaymentGateway,
  OrderRepository, PaymentGateway, ProductCatalog, SettingsStore,
};
use std::sync::Arc;

/// Everything a checkout needs, shared by every invocation.
#[derive(Clone)]
pub struct AppState {
  pub config: Arc<AppConfig>,
  pub carts: Arc<dyn CartStore>,
  pub orders: Arc<dyn OrderRepository>,
  pub discounts: Arc<dyn DiscountValidator>,
  pub gateway: Arc<dyn PaymentGateway>,
  pub catalog: Arc<dyn ProductCatalog>,
  pub settings: Arc<dyn SettingsStore>,
  pub crm: Arc<dyn CrmClient>,
  pub funnels: Arc<dyn FunnelStore>,
}

/// Concrete in-memory collaborators, kept so callers can seed and inspect them.
#[derive(Clone, Default)]
pub struct InMemoryBackends {
  pub carts: Arc<InMemoryCartStore>,
  pub orders: Arc<InMemoryOrderRepository>,
  pub discounts: Arc<InMemoryDiscountValidator>,
  pub gateway: Arc<MockPaymentGateway>,
  pub catalog: Arc<InMemoryCatalog>,
  pub settings: Arc<InMemorySettings>,
  pub crm: Arc<InMemoryCrm>,
  pub funnels: Arc<InMemoryFunnels>,
}

impl InMemoryBackends {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn app_state(&self, config: AppConfig) -> AppState {
    AppState {
      config: Arc::new(config),
      carts: self.carts.clone(),
      orders: self.orders.clone(),
      discounts: self.discounts.clone(),
      gateway: self.gateway.clone(),
      catalog: self.catalog.clone(),
      settings: self.settings.clone(),
      crm: self.crm.clone(),
      funnels: self.funnels.clone(),
    }
  }
}
