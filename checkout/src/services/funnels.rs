// checkout/src/services/funnels.rs

//! Funnel step lookups.

use crate::models::{FunnelStep, TenantId};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

#[async_trait]
pub trait FunnelStore: Send + Sync {
  async fn get_step_by_id(&self, tenant: &TenantId, step_id: &str) -> anyhow::Result<Option<FunnelStep>>;

  async fn get_steps_for_funnel(&self, tenant: &TenantId, funnel_id: &str) -> anyhow::Result<Vec<FunnelStep>>;
}

#[derive(Default)]
pub struct InMemoryFunnels {
  steps: RwLock<Vec<(TenantId, FunnelStep)>>,
  unavailable: AtomicBool,
}

impl InMemoryFunnels {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn add_step(&self, tenant: &TenantId, step: FunnelStep) {
    self.steps.write().push((tenant.clone(), step));
  }

  pub fn set_unavailable(&self, unavailable: bool) {
    self.unavailable.store(unavailable, Ordering::SeqCst);
  }

  fn check(&self) -> anyhow::Result<()> {
    if self.unavailable.load(Ordering::SeqCst) {
      anyhow::bail!("funnel store unavailable");
    }
    Ok(())
  }
}

#[async_trait]
impl FunnelStore for InMemoryFunnels {
  async fn get_step_by_id(&self, tenant: &TenantId, step_id: &str) -> anyhow::Result<Option<FunnelStep>> {
    self.check()?;
    Ok(
      self
        .steps
        .read()
        .iter()
        .find(|(t, s)| t == tenant && s.id == step_id)
        .map(|(_, s)| s.clone()),
    )
  }

  async fn get_steps_for_funnel(&self, tenant: &TenantId, funnel_id: &str) -> anyhow::Result<Vec<FunnelStep>> {
    self.check()?;
    Ok(
      self
        .steps
        .read()
        .iter()
        .filter(|(t, s)| t == tenant && s.funnel_id == funnel_id)
        .map(|(_, s)| s.clone())
        .collect(),
    )
  }
}
