// checkout/src/models/payment.rs

use crate::errors::CheckoutError;
use crate::models::order::{OrderId, TenantId};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayKind {
  AuthorizeNet,
}

impl GatewayKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      GatewayKind::AuthorizeNet => "authorizenet",
    }
  }
}

/// How an order is settled, resolved once from the request's method id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentMethod {
  Free,
  Gateway(GatewayKind),
}

impl PaymentMethod {
  pub fn id(&self) -> &'static str {
    match self {
      PaymentMethod::Free => "free",
      PaymentMethod::Gateway(kind) => kind.as_str(),
    }
  }
}

impl FromStr for PaymentMethod {
  type Err = CheckoutError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim() {
      "free" => Ok(PaymentMethod::Free),
      "authorizenet" => Ok(PaymentMethod::Gateway(GatewayKind::AuthorizeNet)),
      other => Err(CheckoutError::UnsupportedPaymentMethod(other.to_string())),
    }
  }
}

impl fmt::Display for PaymentMethod {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.id())
  }
}

/// Opaque card token produced client-side by the gateway's JS library.
#[derive(Clone, PartialEq, Eq)]
pub struct PaymentToken {
  pub data_descriptor: String,
  pub data_value: String,
}

// Never print the token value, even at debug level.
impl fmt::Debug for PaymentToken {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("PaymentToken")
      .field("data_descriptor", &self.data_descriptor)
      .field("data_value", &"<redacted>")
      .finish()
  }
}

impl PaymentToken {
  /// Reads `opaqueData.{dataDescriptor,dataValue}` out of the request's
  /// payment data. Both must be present and non-blank.
  pub fn from_payment_data(payment_data: Option<&serde_json::Value>) -> Option<Self> {
    let opaque = payment_data?.get("opaqueData")?;
    let field = |name: &str| {
      opaque
        .get(name)
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
    };
    Some(Self {
      data_descriptor: field("dataDescriptor")?,
      data_value: field("dataValue")?,
    })
  }
}

/// The part of the billing address forwarded to the gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BillingSubset {
  pub name: Option<String>,
  pub postcode: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ChargeRequest {
  pub tenant: TenantId,
  pub amount: Decimal,
  pub currency: String,
  pub token: PaymentToken,
  pub billing: BillingSubset,
  pub order_id: OrderId,
}

/// Opens monthly recurring billing on the buyer's card.
#[derive(Debug, Clone)]
pub struct SubscriptionRequest {
  pub tenant: TenantId,
  pub order_id: OrderId,
  pub token: PaymentToken,
  pub email: String,
  pub billing: BillingSubset,
  pub amount_monthly: Decimal,
  pub currency: String,
  /// Date of the first recurring charge.
  pub start_date: NaiveDate,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionOutcome {
  pub success: bool,
  pub subscription_id: Option<String>,
  pub customer_profile_id: Option<String>,
  pub customer_payment_profile_id: Option<String>,
  pub error_message: Option<String>,
}

/// Minimal gateway result. This is also exactly what gets persisted as
/// `order.paymentResponseJson`; raw gateway payloads never reach it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOutcome {
  pub success: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub transaction_id: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub auth_code: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub response_code: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error_code: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error_message: Option<String>,
}

impl PaymentOutcome {
  pub fn approved(transaction_id: impl Into<String>, auth_code: impl Into<String>) -> Self {
    Self {
      success: true,
      transaction_id: Some(transaction_id.into()),
      auth_code: Some(auth_code.into()),
      response_code: Some("1".to_string()),
      ..Default::default()
    }
  }

  pub fn declined(error_code: impl Into<String>, error_message: impl Into<String>) -> Self {
    Self {
      success: false,
      response_code: Some("2".to_string()),
      error_code: Some(error_code.into()),
      error_message: Some(error_message.into()),
      ..Default::default()
    }
  }

  /// The projection worth keeping: success keeps the approval fields,
  /// failure keeps the error fields. Blank values are dropped.
  pub fn projection(&self) -> Self {
    let keep = |v: &Option<String>, wanted: bool| {
      if wanted {
        v.as_deref()
          .map(str::trim)
          .filter(|s| !s.is_empty())
          .map(str::to_string)
      } else {
        None
      }
    };
    Self {
      success: self.success,
      transaction_id: keep(&self.transaction_id, self.success),
      auth_code: keep(&self.auth_code, self.success),
      response_code: keep(&self.response_code, self.success),
      error_code: keep(&self.error_code, !self.success),
      error_message: keep(&self.error_message, !self.success),
    }
  }
}

/// `order.paymentStatus` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
  Pending,
  Paid,
  Failed,
}

impl PaymentStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      PaymentStatus::Pending => "pending",
      PaymentStatus::Paid => "paid",
      PaymentStatus::Failed => "failed",
    }
  }
}

/// `order.status` values: the fulfilment-side status, distinct from the header status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FulfillmentStatus {
  Pending,
  Processing,
  Failed,
}

impl FulfillmentStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      FulfillmentStatus::Pending => "pending",
      FulfillmentStatus::Processing => "processing",
      FulfillmentStatus::Failed => "failed",
    }
  }
}
