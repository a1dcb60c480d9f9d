// checkout/src/pipelines/journal.rs

use crate::models::attributes::saga_marker_key;
use crate::models::ScalarValue;
use crate::pipelines::contexts::CheckoutCtxData;
use crate::services::OrderRepository;
use async_trait::async_trait;
use checkout_saga::{SagaContext, StepJournal};
use chrono::{SecondsFormat, Utc};
use std::sync::Arc;
use tracing::debug;

/// Keeps step completion on the order itself, as `order.saga.<step>`
/// attributes holding the completion time. Before an order exists nothing
/// is recorded and no step counts as completed.
pub struct OrderAttributeJournal {
  orders: Arc<dyn OrderRepository>,
}

impl OrderAttributeJournal {
  pub fn new(orders: Arc<dyn OrderRepository>) -> Self {
    Self { orders }
  }
}

#[async_trait]
impl StepJournal<CheckoutCtxData> for OrderAttributeJournal {
  async fn is_completed(&self, ctx: &SagaContext<CheckoutCtxData>, step_name: &str) -> anyhow::Result<bool> {
    let Some(order_id) = ctx.with(|c| c.order_id.clone()) else {
      return Ok(false);
    };
    let marker = self.orders.get_attribute(&order_id, &saga_marker_key(step_name)).await?;
    Ok(marker.is_some_and(|v| v != ScalarValue::Null))
  }

  async fn record_completed(&self, ctx: &SagaContext<CheckoutCtxData>, step_name: &str) -> anyhow::Result<()> {
    let Some(order_id) = ctx.with(|c| c.order_id.clone()) else {
      return Ok(());
    };
    let completed_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    self
      .orders
      .set_attribute(&order_id, &saga_marker_key(step_name), ScalarValue::from(completed_at))
      .await?;
    debug!(order_id = %order_id, step = step_name, "Saga step marker written.");
    Ok(())
  }
}
