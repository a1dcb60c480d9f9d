// checkout/src/components/crm_sync.rs

//! Post-purchase CRM sync: make sure the buyer has a contact and tag it with
//! the marketing tags configured on the purchased products.

use crate::components::eligibility::ProductAttributeCache;
use crate::models::crm::{CONTACT_SOURCE_CHECKOUT, TAG_SOURCE_PRODUCT_PURCHASE};
use crate::models::{keys, ContactDraft, ContactId, ContactUpdate, ScalarValue, TagId, TenantId};
use crate::services::settings::CRM_ENABLED_OPTION;
use crate::services::{CrmClient, SettingsStore};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, instrument};

/// Who bought, as the CRM sees it.
#[derive(Debug, Clone)]
pub struct Purchaser<'a> {
  pub email: &'a str,
  pub user_id: Option<&'a str>,
  pub billing_name: Option<&'a str>,
  pub shipping_name: Option<&'a str>,
}

impl Purchaser<'_> {
  /// Billing name, then shipping name, then the email.
  pub fn display_name(&self) -> String {
    self
      .billing_name
      .or(self.shipping_name)
      .map(str::trim)
      .filter(|n| !n.is_empty())
      .unwrap_or_else(|| self.email.trim())
      .to_string()
  }
}

/// The tenant option is enabled by any truthy JSON value.
pub async fn crm_enabled(settings: &dyn SettingsStore, tenant: &TenantId) -> anyhow::Result<bool> {
  let option = settings.get_option(tenant, CRM_ENABLED_OPTION).await?;
  Ok(option.as_ref().is_some_and(is_truthy))
}

fn is_truthy(value: &serde_json::Value) -> bool {
  match value {
    serde_json::Value::Null => false,
    serde_json::Value::Bool(b) => *b,
    serde_json::Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
    serde_json::Value::String(s) => !s.is_empty(),
    serde_json::Value::Array(_) | serde_json::Value::Object(_) => true,
  }
}

/// Lowercases and collapses every run of non `[a-z0-9]` characters into one dash.
pub fn slugify(value: &str) -> String {
  let mut slug = String::with_capacity(value.len());
  let mut pending_dash = false;
  for c in value.chars().flat_map(char::to_lowercase) {
    if c.is_ascii_lowercase() || c.is_ascii_digit() {
      if pending_dash && !slug.is_empty() {
        slug.push('-');
      }
      pending_dash = false;
      slug.push(c);
    } else {
      pending_dash = true;
    }
  }
  slug
}

pub async fn resolve_or_create_contact(
  crm: &dyn CrmClient,
  tenant: &TenantId,
  purchaser: &Purchaser<'_>,
  now: DateTime<Utc>,
) -> anyhow::Result<ContactId> {
  let email = purchaser.email.trim();
  let existing = match purchaser.user_id {
    Some(user_id) => match crm.find_contact_for_user(tenant, user_id).await? {
      Some(id) => Some(id),
      None => crm.find_contact_by_email(tenant, email).await?,
    },
    None => crm.find_contact_by_email(tenant, email).await?,
  };

  let name = purchaser.display_name();
  if let Some(contact) = existing {
    let update = ContactUpdate {
      name: Some(name).filter(|n| !n.is_empty()),
      email: email.to_string(),
      user_id: purchaser.user_id.map(str::to_string),
    };
    crm.update_contact(tenant, &contact, update).await?;
    debug!(contact = %contact.0, "CRM contact refreshed.");
    return Ok(contact);
  }

  let slug = match slugify(email) {
    s if s.is_empty() => format!("contact-{}", now.timestamp_millis()),
    s => s,
  };
  let draft = ContactDraft {
    slug,
    name: if name.is_empty() { "Contact".to_string() } else { name },
    email: email.to_string(),
    user_id: purchaser.user_id.map(str::to_string),
    source: CONTACT_SOURCE_CHECKOUT.to_string(),
  };
  let contact = crm.create_contact(tenant, draft).await?;
  info!(contact = %contact.0, "CRM contact created.");
  Ok(contact)
}

/// Tag ids and tag slugs configured across the purchased products, each
/// normalized and deduplicated in first-seen order.
pub fn collect_tag_refs(product_ids: &[String], cache: &ProductAttributeCache) -> (Vec<TagId>, Vec<String>) {
  let mut ids = Vec::new();
  let mut slugs = Vec::new();
  let mut seen_ids = HashSet::new();
  let mut seen_slugs = HashSet::new();

  for attrs in product_ids.iter().filter_map(|id| cache.get(id)) {
    for raw in parse_string_array(attrs.get(keys::PRODUCT_CRM_TAG_IDS)) {
      let id = raw.trim().to_string();
      if !id.is_empty() && seen_ids.insert(id.clone()) {
        ids.push(TagId(id));
      }
    }
    for raw in parse_string_array(attrs.get(keys::PRODUCT_CRM_TAG_SLUGS)) {
      let slug = raw.trim().to_lowercase();
      if !slug.is_empty() && seen_slugs.insert(slug.clone()) {
        slugs.push(slug);
      }
    }
  }
  (ids, slugs)
}

// Malformed or non-array JSON reads as no tags; non-string members are dropped.
fn parse_string_array(value: Option<&ScalarValue>) -> Vec<String> {
  let Some(raw) = value.and_then(ScalarValue::as_str) else {
    return Vec::new();
  };
  match serde_json::from_str::<serde_json::Value>(raw) {
    Ok(serde_json::Value::Array(items)) => items
      .into_iter()
      .filter_map(|v| match v {
        serde_json::Value::String(s) => Some(s),
        _ => None,
      })
      .collect(),
    _ => Vec::new(),
  }
}

/// Finds the tag with `slug` in `known`, creating it when missing.
pub async fn ensure_tag_by_slug(
  crm: &dyn CrmClient,
  tenant: &TenantId,
  slug: &str,
  known: &mut HashMap<String, TagId>,
) -> anyhow::Result<TagId> {
  if let Some(id) = known.get(slug) {
    return Ok(id.clone());
  }
  let id = crm.create_tag(tenant, slug, slug).await?;
  info!(tag = %id.0, %slug, "Marketing tag created.");
  known.insert(slug.to_string(), id.clone());
  Ok(id)
}

#[instrument(name = "crm_sync::sync_purchase", skip_all, fields(tenant = %tenant))]
pub async fn sync_purchase(
  crm: &dyn CrmClient,
  tenant: &TenantId,
  purchaser: &Purchaser<'_>,
  product_ids: &[String],
  cache: &ProductAttributeCache,
  now: DateTime<Utc>,
) -> anyhow::Result<()> {
  let contact = resolve_or_create_contact(crm, tenant, purchaser, now).await?;
  let (tag_ids, tag_slugs) = collect_tag_refs(product_ids, cache);

  for tag in &tag_ids {
    crm.assign_tag(tenant, &contact, tag, TAG_SOURCE_PRODUCT_PURCHASE).await?;
  }

  if !tag_slugs.is_empty() {
    let mut known: HashMap<String, TagId> = crm
      .list_tags(tenant)
      .await?
      .into_iter()
      .map(|t| (t.slug.trim().to_lowercase(), t.id))
      .filter(|(slug, id)| !slug.is_empty() && !id.0.is_empty())
      .collect();
    for slug in &tag_slugs {
      let tag = ensure_tag_by_slug(crm, tenant, slug, &mut known).await?;
      crm.assign_tag(tenant, &contact, &tag, TAG_SOURCE_PRODUCT_PURCHASE).await?;
    }
  }

  info!(
    contact = %contact.0,
    tags_by_id = tag_ids.len(),
    tags_by_slug = tag_slugs.len(),
    "CRM sync finished."
  );
  Ok(())
}
