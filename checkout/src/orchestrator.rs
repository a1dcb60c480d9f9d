// checkout/src/orchestrator.rs

//! Entry point of order placement.

use crate::errors::{CheckoutError, Result};
use crate::models::{CartIdentity, PlaceOrderRequest, PlaceOrderResponse};
use crate::pipelines::{build_checkout_saga, CheckoutCtxData, OrderAttributeJournal};
use crate::state::AppState;
use checkout_saga::{Saga, SagaContext, SagaError, SagaStatus};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Turns a cart into a paid (or failed) order. Built once and shared; each
/// `place_order` call runs the checkout saga over a fresh context.
pub struct CheckoutOrchestrator {
  state: AppState,
  saga: Saga<CheckoutCtxData, CheckoutError>,
}

impl CheckoutOrchestrator {
  pub fn new(state: AppState) -> Self {
    let mut saga = build_checkout_saga();
    saga.set_journal(Arc::new(OrderAttributeJournal::new(state.orders.clone())));
    Self { state, saga }
  }

  #[instrument(
    name = "checkout::place_order",
    skip_all,
    fields(
      tenant = %request.tenant_id,
      idempotency_key = request.idempotency_key().unwrap_or_default(),
      payment_method = %request.payment_method_id,
    )
  )]
  pub async fn place_order(&self, request: PlaceOrderRequest) -> Result<PlaceOrderResponse> {
    let identity = CartIdentity::from_request(request.user_id.as_deref(), request.guest_session_id.as_deref())?;
    if request.email.trim().is_empty() {
      return Err(CheckoutError::Validation("email is required".to_string()));
    }
    if request.tenant_id.as_str().trim().is_empty() {
      return Err(CheckoutError::Validation("tenantId is required".to_string()));
    }

    let ctx = SagaContext::new(CheckoutCtxData::new(self.state.clone(), request, identity, Utc::now()));
    let report = self.saga.run(ctx.clone()).await?;

    if let SagaStatus::Halted { step } = &report.status {
      return Err(CheckoutError::Workflow {
        source: SagaError::Internal(format!("checkout halted unexpectedly at step '{}'", step)),
      });
    }
    for degraded in &report.degraded {
      warn!(step = %degraded.step, error = %degraded.error, "Step did not fully complete; left for reconciliation.");
    }

    let (order_id, redirect_url, replayed) = ctx.with(|c| (c.order_id.clone(), c.redirect_url.clone(), c.is_replay()));
    let order_id = order_id.ok_or_else(|| CheckoutError::Workflow {
      source: SagaError::Internal("checkout finished without an order id".to_string()),
    })?;

    info!(order_id = %order_id, replayed, redirect = ?redirect_url, "Order placed.");
    Ok(PlaceOrderResponse {
      success: true,
      order_id,
      redirect_url,
    })
  }
}
