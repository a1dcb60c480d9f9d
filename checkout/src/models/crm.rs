// checkout/src/models/crm.rs

use serde::{Deserialize, Serialize};

pub const CONTACT_SOURCE_CHECKOUT: &str = "commerce.checkout";
pub const TAG_SOURCE_PRODUCT_PURCHASE: &str = "commerce.product_purchase";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContactId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagId(pub String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketingTag {
  pub id: TagId,
  pub slug: String,
  pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactDraft {
  pub slug: String,
  pub name: String,
  pub email: String,
  pub user_id: Option<String>,
  pub source: String,
}

/// Fields refreshed on an existing contact after a purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactUpdate {
  pub name: Option<String>,
  pub email: String,
  pub user_id: Option<String>,
}
