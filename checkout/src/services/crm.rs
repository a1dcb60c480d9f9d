// checkout/src/services/crm.rs

//! CRM contact and marketing tag contract, plus an in-memory implementation.

use crate::models::{ContactDraft, ContactId, ContactUpdate, MarketingTag, TagId, TenantId};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use uuid::Uuid;

#[async_trait]
pub trait CrmClient: Send + Sync {
  async fn find_contact_for_user(&self, tenant: &TenantId, user_id: &str) -> anyhow::Result<Option<ContactId>>;

  async fn find_contact_by_email(&self, tenant: &TenantId, email: &str) -> anyhow::Result<Option<ContactId>>;

  async fn create_contact(&self, tenant: &TenantId, draft: ContactDraft) -> anyhow::Result<ContactId>;

  async fn update_contact(&self, tenant: &TenantId, contact: &ContactId, update: ContactUpdate) -> anyhow::Result<()>;

  async fn list_tags(&self, tenant: &TenantId) -> anyhow::Result<Vec<MarketingTag>>;

  async fn create_tag(&self, tenant: &TenantId, slug: &str, name: &str) -> anyhow::Result<TagId>;

  async fn assign_tag(&self, tenant: &TenantId, contact: &ContactId, tag: &TagId, source: &str) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredContact {
  pub id: ContactId,
  pub tenant: TenantId,
  pub slug: String,
  pub name: String,
  pub email: String,
  pub user_id: Option<String>,
  pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagAssignment {
  pub contact: ContactId,
  pub tag: TagId,
  pub source: String,
}

#[derive(Default)]
pub struct InMemoryCrm {
  contacts: RwLock<Vec<StoredContact>>,
  tags: RwLock<Vec<(TenantId, MarketingTag)>>,
  assignments: RwLock<Vec<TagAssignment>>,
  unavailable: AtomicBool,
  calls: AtomicUsize,
}

impl InMemoryCrm {
  pub fn new() -> Self {
    Self::default()
  }

  /// Every call fails while set.
  pub fn set_unavailable(&self, unavailable: bool) {
    self.unavailable.store(unavailable, Ordering::SeqCst);
  }

  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }

  pub fn contacts(&self) -> Vec<StoredContact> {
    self.contacts.read().clone()
  }

  pub fn assignments(&self) -> Vec<TagAssignment> {
    self.assignments.read().clone()
  }

  pub fn tags(&self, tenant: &TenantId) -> Vec<MarketingTag> {
    self
      .tags
      .read()
      .iter()
      .filter(|(t, _)| t == tenant)
      .map(|(_, tag)| tag.clone())
      .collect()
  }

  pub fn seed_tag(&self, tenant: &TenantId, id: &str, slug: &str) {
    self.tags.write().push((
      tenant.clone(),
      MarketingTag {
        id: TagId(id.to_string()),
        slug: slug.to_string(),
        name: slug.to_string(),
      },
    ));
  }

  fn enter(&self) -> anyhow::Result<()> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    if self.unavailable.load(Ordering::SeqCst) {
      anyhow::bail!("CRM service unavailable");
    }
    Ok(())
  }
}

#[async_trait]
impl CrmClient for InMemoryCrm {
  async fn find_contact_for_user(&self, tenant: &TenantId, user_id: &str) -> anyhow::Result<Option<ContactId>> {
    self.enter()?;
    Ok(
      self
        .contacts
        .read()
        .iter()
        .find(|c| &c.tenant == tenant && c.user_id.as_deref() == Some(user_id))
        .map(|c| c.id.clone()),
    )
  }

  async fn find_contact_by_email(&self, tenant: &TenantId, email: &str) -> anyhow::Result<Option<ContactId>> {
    self.enter()?;
    Ok(
      self
        .contacts
        .read()
        .iter()
        .find(|c| &c.tenant == tenant && c.email.eq_ignore_ascii_case(email))
        .map(|c| c.id.clone()),
    )
  }

  async fn create_contact(&self, tenant: &TenantId, draft: ContactDraft) -> anyhow::Result<ContactId> {
    self.enter()?;
    let id = ContactId(format!("ct_{}", Uuid::new_v4().simple()));
    self.contacts.write().push(StoredContact {
      id: id.clone(),
      tenant: tenant.clone(),
      slug: draft.slug,
      name: draft.name,
      email: draft.email,
      user_id: draft.user_id,
      source: draft.source,
    });
    Ok(id)
  }

  async fn update_contact(&self, tenant: &TenantId, contact: &ContactId, update: ContactUpdate) -> anyhow::Result<()> {
    self.enter()?;
    let mut contacts = self.contacts.write();
    let stored = contacts
      .iter_mut()
      .find(|c| &c.tenant == tenant && &c.id == contact)
      .ok_or_else(|| anyhow::anyhow!("contact {} not found", contact.0))?;
    if let Some(name) = update.name {
      stored.name = name;
    }
    stored.email = update.email;
    if update.user_id.is_some() {
      stored.user_id = update.user_id;
    }
    Ok(())
  }

  async fn list_tags(&self, tenant: &TenantId) -> anyhow::Result<Vec<MarketingTag>> {
    self.enter()?;
    Ok(self.tags(tenant))
  }

  async fn create_tag(&self, tenant: &TenantId, slug: &str, name: &str) -> anyhow::Result<TagId> {
    self.enter()?;
    let id = TagId(format!("tag_{}", Uuid::new_v4().simple()));
    self.tags.write().push((
      tenant.clone(),
      MarketingTag {
        id: id.clone(),
        slug: slug.to_string(),
        name: name.to_string(),
      },
    ));
    Ok(id)
  }

  async fn assign_tag(&self, _tenant: &TenantId, contact: &ContactId, tag: &TagId, source: &str) -> anyhow::Result<()> {
    self.enter()?;
    let mut assignments = self.assignments.write();
    let already = assignments.iter().any(|a| &a.contact == contact && &a.tag == tag);
    if !already {
      assignments.push(TagAssignment {
        contact: contact.clone(),
        tag: tag.clone(),
        source: source.to_string(),
      });
    }
    Ok(())
  }
}
