// checkout/src/components/funnel.rs

use crate::models::{FunnelStep, OrderId, TenantId};
use crate::services::FunnelStore;
use tracing::{debug, instrument};

/// The lowest-ordered linkable sibling placed after `current`.
pub fn next_step<'a>(current: &FunnelStep, siblings: &'a [FunnelStep]) -> Option<&'a FunnelStep> {
  siblings
    .iter()
    .filter(|s| s.slug.as_deref().is_some_and(|slug| !slug.trim().is_empty()))
    .filter(|s| s.order > current.order)
    .min_by_key(|s| s.order)
}

pub fn build_redirect_url(current: &FunnelStep, next: &FunnelStep, order_id: &OrderId) -> Option<String> {
  let slug = next.slug.as_deref()?.trim();
  let base = if current.is_default_funnel {
    format!("/checkout/{}", urlencoding::encode(slug))
  } else {
    format!(
      "/f/{}/{}",
      urlencoding::encode(&current.funnel_slug),
      urlencoding::encode(slug)
    )
  };
  Some(format!("{}?orderId={}", base, urlencoding::encode(order_id.as_str())))
}

/// Where the buyer goes after checkout, if the submitted step has a successor.
#[instrument(name = "funnel::next_step_url", skip(funnels), fields(tenant = %tenant, order_id = %order_id))]
pub async fn next_step_url(
  funnels: &dyn FunnelStore,
  tenant: &TenantId,
  step_id: &str,
  order_id: &OrderId,
) -> anyhow::Result<Option<String>> {
  let Some(current) = funnels.get_step_by_id(tenant, step_id).await? else {
    debug!("Funnel step not found; no redirect.");
    return Ok(None);
  };
  if current.funnel_id.trim().is_empty() || current.funnel_slug.trim().is_empty() {
    return Ok(None);
  }

  let siblings = funnels.get_steps_for_funnel(tenant, &current.funnel_id).await?;
  let url = next_step(&current, &siblings).and_then(|next| build_redirect_url(&current, next, order_id));
  debug!(redirect = ?url, "Funnel redirect resolved.");
  Ok(url)
}
