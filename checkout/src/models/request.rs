// checkout/src/models/request.rs

use crate::models::order::{OrderId, TenantId};
use serde::{Deserialize, Serialize};

fn non_blank(v: &Option<String>) -> Option<&str> {
  v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Postal fields shared by billing and shipping. Every field is optional;
/// the checkout form sends `null` for the ones left empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
  pub name: Option<String>,
  pub phone: Option<String>,
  pub address1: Option<String>,
  pub address2: Option<String>,
  pub city: Option<String>,
  pub state: Option<String>,
  pub postcode: Option<String>,
  pub country: Option<String>,
}

impl Address {
  pub fn name(&self) -> Option<&str> {
    non_blank(&self.name)
  }

  pub fn phone(&self) -> Option<&str> {
    non_blank(&self.phone)
  }

  pub fn postcode(&self) -> Option<&str> {
    non_blank(&self.postcode)
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingAddress {
  #[serde(flatten)]
  pub address: Address,
  pub email: Option<String>,
}

impl BillingAddress {
  pub fn email(&self) -> Option<&str> {
    non_blank(&self.email)
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
  #[serde(alias = "organizationId")]
  pub tenant_id: TenantId,
  #[serde(default)]
  pub user_id: Option<String>,
  #[serde(default)]
  pub guest_session_id: Option<String>,
  #[serde(default)]
  pub funnel_step_id: Option<String>,
  #[serde(default)]
  pub idempotency_key: Option<String>,
  pub email: String,
  #[serde(default)]
  pub billing: BillingAddress,
  #[serde(default)]
  pub shipping: Address,
  pub payment_method_id: String,
  /// Opaque to this crate apart from `opaqueData`.
  #[serde(default)]
  pub payment_data: Option<serde_json::Value>,
  #[serde(default)]
  pub coupon_code: Option<String>,
}

impl PlaceOrderRequest {
  pub fn idempotency_key(&self) -> Option<&str> {
    non_blank(&self.idempotency_key)
  }

  pub fn coupon_code(&self) -> Option<&str> {
    non_blank(&self.coupon_code)
  }

  pub fn funnel_step_id(&self) -> Option<&str> {
    non_blank(&self.funnel_step_id)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderResponse {
  pub success: bool,
  pub order_id: OrderId,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub redirect_url: Option<String>,
}
