// checkout/src/models/funnel.rs

/// One stage of a tenant-defined purchase funnel.
#[derive(Debug, Clone, PartialEq)]
pub struct FunnelStep {
  pub id: String,
  pub funnel_id: String,
  pub funnel_slug: String,
  pub is_default_funnel: bool,
  /// Steps without a slug cannot be linked to and are never redirect targets.
  pub slug: Option<String>,
  pub order: i64,
}
