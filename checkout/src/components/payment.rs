// checkout/src/components/payment.rs

//! Settlement planning and execution: free orders are marked paid, gateway
//! orders are charged exactly once.

use crate::components::order_store;
use crate::components::subscription::SubscriptionTerms;
use crate::errors::{CheckoutError, Result};
use crate::models::{
  keys, BillingSubset, ChargeRequest, FulfillmentStatus, GatewayKind, OrderId, OrderStatus, PaymentMethod,
  PaymentOutcome, PaymentStatus, PaymentToken, TenantId,
};
use crate::services::{OrderRepository, PaymentGateway};
use rust_decimal::Decimal;
use serde_json::json;
use tracing::{error, info, instrument, warn};

/// How an order will be settled, decided before the order row is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementPlan {
  Free,
  Charge { kind: GatewayKind, token: PaymentToken },
  /// The first payment settles like a charge (or free when `charge_now` is
  /// false); recurring billing opens on the same card afterwards.
  Subscription {
    kind: GatewayKind,
    token: PaymentToken,
    terms: SubscriptionTerms,
    charge_now: bool,
  },
}

impl SettlementPlan {
  pub fn is_free(&self) -> bool {
    matches!(self, SettlementPlan::Free)
  }

  /// Gateway and card charged at checkout, if any.
  pub fn charge(&self) -> Option<(GatewayKind, &PaymentToken)> {
    match self {
      SettlementPlan::Free => None,
      SettlementPlan::Charge { kind, token } => Some((*kind, token)),
      SettlementPlan::Subscription {
        kind,
        token,
        charge_now,
        ..
      } => charge_now.then_some((*kind, token)),
    }
  }

  pub fn subscription(&self) -> Option<(&SubscriptionTerms, &PaymentToken)> {
    match self {
      SettlementPlan::Subscription { terms, token, .. } => Some((terms, token)),
      _ => None,
    }
  }
}

/// Zero totals never touch the gateway, whatever method was picked.
/// Subscriptions always need a card, even when nothing is charged today.
pub fn plan_settlement(
  method: PaymentMethod,
  total: Decimal,
  payment_data: Option<&serde_json::Value>,
  subscription: Option<SubscriptionTerms>,
) -> Result<SettlementPlan> {
  if let Some(terms) = subscription {
    let PaymentMethod::Gateway(kind) = method else {
      return Err(CheckoutError::InvalidSubscription(
        "Subscription checkout currently supports only Authorize.Net as the payment method.".to_string(),
      ));
    };
    let token = PaymentToken::from_payment_data(payment_data).ok_or(CheckoutError::MissingPaymentToken)?;
    return Ok(SettlementPlan::Subscription {
      kind,
      token,
      terms,
      charge_now: total > Decimal::ZERO,
    });
  }
  if total <= Decimal::ZERO {
    return Ok(SettlementPlan::Free);
  }
  match method {
    PaymentMethod::Free => {
      warn!(%total, "Free payment method requested for a non-zero total; settling as free.");
      Ok(SettlementPlan::Free)
    }
    PaymentMethod::Gateway(kind) => {
      let token = PaymentToken::from_payment_data(payment_data).ok_or(CheckoutError::MissingPaymentToken)?;
      Ok(SettlementPlan::Charge { kind, token })
    }
  }
}

/// Per-order inputs to [`settle`].
pub struct Settlement<'a> {
  pub tenant: &'a TenantId,
  pub order_id: &'a OrderId,
  pub plan: &'a SettlementPlan,
  pub total: Decimal,
  pub currency: &'a str,
  pub billing: BillingSubset,
}

/// Records the payment result on the order and aligns the header status.
/// A gateway decline, or a gateway that cannot be reached, fails the order
/// and surfaces as [`CheckoutError::PaymentDeclined`].
#[instrument(
  name = "payment::settle",
  skip(orders, gateway, settlement),
  fields(order_id = %settlement.order_id, total = %settlement.total)
)]
pub async fn settle(
  orders: &dyn OrderRepository,
  gateway: &dyn PaymentGateway,
  settlement: Settlement<'_>,
) -> Result<PaymentOutcome> {
  let order_id = settlement.order_id;
  let Some((kind, token)) = settlement.plan.charge() else {
    orders.set_attribute(order_id, keys::GATEWAY, "free".into()).await?;
    orders
      .set_attribute(order_id, keys::PAYMENT_STATUS, PaymentStatus::Paid.as_str().into())
      .await?;
    orders
      .set_attribute(order_id, keys::ORDER_STATUS, FulfillmentStatus::Processing.as_str().into())
      .await?;
    let response = json!({ "success": true, "reason": "free_order" });
    orders
      .set_attribute(order_id, keys::PAYMENT_RESPONSE_JSON, response.to_string().into())
      .await?;
    order_store::set_status(orders, order_id, OrderStatus::Paid).await?;
    info!("Free order settled.");
    return Ok(PaymentOutcome {
      success: true,
      ..Default::default()
    });
  };

  let request = ChargeRequest {
    tenant: settlement.tenant.clone(),
    amount: settlement.total,
    currency: settlement.currency.to_string(),
    token: token.clone(),
    billing: settlement.billing,
    order_id: order_id.clone(),
  };
  let outcome = match gateway.charge(request).await {
    Ok(outcome) => outcome,
    Err(e) => {
      warn!(error = %e, "Gateway unreachable; treating the charge as declined.");
      PaymentOutcome {
        success: false,
        error_message: Some(e.to_string()),
        ..Default::default()
      }
    }
  };
  record_charge(orders, order_id, kind, &outcome).await?;

  if outcome.success {
    info!(transaction_id = ?outcome.transaction_id, "Payment captured.");
    Ok(outcome)
  } else {
    error!(
      error_code = ?outcome.error_code,
      error_message = ?outcome.error_message,
      "Payment failed; order marked failed."
    );
    Err(CheckoutError::PaymentDeclined)
  }
}

async fn record_charge(
  orders: &dyn OrderRepository,
  order_id: &OrderId,
  kind: GatewayKind,
  outcome: &PaymentOutcome,
) -> Result<()> {
  let (payment_status, fulfillment_status, header_status) = if outcome.success {
    (PaymentStatus::Paid, FulfillmentStatus::Processing, OrderStatus::Paid)
  } else {
    (PaymentStatus::Failed, FulfillmentStatus::Failed, OrderStatus::Failed)
  };

  orders.set_attribute(order_id, keys::GATEWAY, kind.as_str().into()).await?;
  orders
    .set_attribute(order_id, keys::PAYMENT_STATUS, payment_status.as_str().into())
    .await?;
  orders
    .set_attribute(order_id, keys::ORDER_STATUS, fulfillment_status.as_str().into())
    .await?;
  if outcome.success {
    if let Some(txn) = outcome.transaction_id.as_deref() {
      orders.set_attribute(order_id, keys::GATEWAY_TRANSACTION_ID, txn.into()).await?;
    }
  }
  let projection = serde_json::to_string(&outcome.projection()).map_err(|e| CheckoutError::Service {
    source: anyhow::Error::new(e).context("serializing payment response"),
  })?;
  orders
    .set_attribute(order_id, keys::PAYMENT_RESPONSE_JSON, projection.into())
    .await?;
  order_store::set_status(orders, order_id, header_status).await?;
  Ok(())
}
