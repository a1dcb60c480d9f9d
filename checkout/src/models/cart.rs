// checkout/src/models/cart.rs

use crate::errors::{CheckoutError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CartOwner {
  User(String),
  Guest(String),
}

impl fmt::Display for CartOwner {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      CartOwner::User(id) => write!(f, "user:{}", id),
      CartOwner::Guest(id) => write!(f, "guest:{}", id),
    }
  }
}

/// Who the cart belongs to: the signed-in user when there is one, else the
/// guest session. A signed-in buyer may also bring a guest session whose
/// cart still has to be folded in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartIdentity {
  owner: CartOwner,
  merge_guest: Option<String>,
}

impl CartIdentity {
  pub fn from_request(user_id: Option<&str>, guest_session_id: Option<&str>) -> Result<Self> {
    let normalize = |v: Option<&str>| v.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string);
    match (normalize(user_id), normalize(guest_session_id)) {
      (Some(user), guest) => Ok(Self {
        owner: CartOwner::User(user),
        merge_guest: guest,
      }),
      (None, Some(guest)) => Ok(Self {
        owner: CartOwner::Guest(guest),
        merge_guest: None,
      }),
      (None, None) => Err(CheckoutError::MissingCartIdentity),
    }
  }

  pub fn user_id(&self) -> Option<&str> {
    match &self.owner {
      CartOwner::User(user) => Some(user.as_str()),
      CartOwner::Guest(_) => None,
    }
  }

  /// The cart the snapshot is read from.
  pub fn snapshot_owner(&self) -> &CartOwner {
    &self.owner
  }

  /// `(user, guest)` when a guest cart has to be merged into the user's first.
  pub fn guest_to_merge(&self) -> Option<(&str, &str)> {
    match (&self.owner, &self.merge_guest) {
      (CartOwner::User(user), Some(guest)) => Some((user.as_str(), guest.as_str())),
      _ => None,
    }
  }

  /// Every cart this checkout may have drawn from.
  pub fn owners(&self) -> Vec<CartOwner> {
    let mut owners = vec![self.owner.clone()];
    if let Some(guest) = &self.merge_guest {
      owners.push(CartOwner::Guest(guest.clone()));
    }
    owners
  }
}

/// A cart row as the cart store returns it, before normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CartRow {
  pub product_id: Option<String>,
  pub title: Option<String>,
  pub unit_price: Option<Decimal>,
  pub quantity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
  pub product_id: String,
  pub title: String,
  #[serde(with = "rust_decimal::serde::float")]
  pub unit_price: Decimal,
  pub quantity: u32,
}

impl LineItem {
  pub fn line_total(&self) -> Option<Decimal> {
    self.unit_price.checked_mul(Decimal::from(self.quantity))
  }
}
