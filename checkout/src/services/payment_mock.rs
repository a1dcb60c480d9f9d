// checkout/src/services/payment_mock.rs

//! Payment gateway contract and a scriptable mock gateway.

use crate::models::{ChargeRequest, OrderId, PaymentOutcome, SubscriptionOutcome, SubscriptionRequest};
use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{info, instrument, warn};
use uuid::Uuid;

#[async_trait]
pub trait PaymentGateway: Send + Sync {
  /// Authorizes and captures `request.amount`. A decline is an `Ok` outcome
  /// with `success == false`; `Err` means the gateway could not be reached.
  async fn charge(&self, request: ChargeRequest) -> anyhow::Result<PaymentOutcome>;

  /// Stores the card on a customer profile and opens monthly recurring
  /// billing from `request.start_date`. A refusal is an `Ok` outcome with
  /// `success == false`.
  async fn create_subscription(&self, request: SubscriptionRequest) -> anyhow::Result<SubscriptionOutcome>;
}

/// What the mock does with the next charge.
#[derive(Debug, Clone)]
pub enum MockCharge {
  Approve,
  Decline { code: String, message: String },
  TransportError(String),
}

/// What the mock does with the next subscription request.
#[derive(Debug, Clone)]
pub enum MockSubscription {
  Open,
  Refuse(String),
  /// Reports success but returns no subscription id.
  OpenWithoutId,
  TransportError(String),
}

/// Token value the mock always declines, like a gateway's test card.
pub const MOCK_DECLINE_TOKEN: &str = "tok_decline";

#[derive(Debug, Clone, PartialEq)]
pub struct ChargeRecord {
  pub order_id: OrderId,
  pub amount: Decimal,
  pub currency: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionRecord {
  pub order_id: OrderId,
  pub amount_monthly: Decimal,
  pub currency: String,
  pub start_date: NaiveDate,
  pub email: String,
}

#[derive(Default)]
pub struct MockPaymentGateway {
  script: Mutex<VecDeque<MockCharge>>,
  charges: Mutex<Vec<ChargeRecord>>,
  subscription_script: Mutex<VecDeque<MockSubscription>>,
  subscriptions: Mutex<Vec<SubscriptionRecord>>,
  latency: Option<Duration>,
}

impl MockPaymentGateway {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_latency(latency: Duration) -> Self {
    Self {
      latency: Some(latency),
      ..Default::default()
    }
  }

  /// Queues the behaviour of upcoming charges. Unscripted charges are approved.
  pub fn script(&self, next: MockCharge) {
    self.script.lock().push_back(next);
  }

  pub fn charge_count(&self) -> usize {
    self.charges.lock().len()
  }

  pub fn charges(&self) -> Vec<ChargeRecord> {
    self.charges.lock().clone()
  }

  /// Queues the behaviour of upcoming subscription requests. Unscripted ones open.
  pub fn script_subscription(&self, next: MockSubscription) {
    self.subscription_script.lock().push_back(next);
  }

  pub fn subscriptions(&self) -> Vec<SubscriptionRecord> {
    self.subscriptions.lock().clone()
  }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
  #[instrument(
    name = "mock_gateway::charge",
    skip(self, request),
    fields(order_id = %request.order_id, amount = %request.amount, currency = %request.currency)
  )]
  async fn charge(&self, request: ChargeRequest) -> anyhow::Result<PaymentOutcome> {
    if let Some(latency) = self.latency {
      tokio::time::sleep(latency).await;
    }

    self.charges.lock().push(ChargeRecord {
      order_id: request.order_id.clone(),
      amount: request.amount,
      currency: request.currency.clone(),
    });

    let scripted = self.script.lock().pop_front();
    let next = match scripted {
      Some(next) => next,
      None if request.token.data_value == MOCK_DECLINE_TOKEN => MockCharge::Decline {
        code: "2".to_string(),
        message: "This transaction has been declined.".to_string(),
      },
      None => MockCharge::Approve,
    };

    match next {
      MockCharge::Approve => {
        let txn = format!("mock_txn_{}", Uuid::new_v4().simple());
        info!(transaction_id = %txn, "Mock charge approved.");
        Ok(PaymentOutcome::approved(txn, "MOCK01"))
      }
      MockCharge::Decline { code, message } => {
        info!(error_code = %code, "Mock charge declined.");
        Ok(PaymentOutcome::declined(code, message))
      }
      MockCharge::TransportError(message) => {
        warn!("Mock gateway transport failure.");
        Err(anyhow::anyhow!(message))
      }
    }
  }

  #[instrument(
    name = "mock_gateway::create_subscription",
    skip(self, request),
    fields(order_id = %request.order_id, amount_monthly = %request.amount_monthly, start_date = %request.start_date)
  )]
  async fn create_subscription(&self, request: SubscriptionRequest) -> anyhow::Result<SubscriptionOutcome> {
    if let Some(latency) = self.latency {
      tokio::time::sleep(latency).await;
    }

    self.subscriptions.lock().push(SubscriptionRecord {
      order_id: request.order_id.clone(),
      amount_monthly: request.amount_monthly,
      currency: request.currency.clone(),
      start_date: request.start_date,
      email: request.email.clone(),
    });

    let next = self.subscription_script.lock().pop_front().unwrap_or(MockSubscription::Open);
    match next {
      MockSubscription::Open => {
        let id = format!("mock_sub_{}", Uuid::new_v4().simple());
        info!(subscription_id = %id, "Mock subscription opened.");
        Ok(SubscriptionOutcome {
          success: true,
          subscription_id: Some(id),
          customer_profile_id: Some(format!("mock_cust_{}", Uuid::new_v4().simple())),
          customer_payment_profile_id: Some(format!("mock_pay_{}", Uuid::new_v4().simple())),
          error_message: None,
        })
      }
      MockSubscription::OpenWithoutId => Ok(SubscriptionOutcome {
        success: true,
        ..Default::default()
      }),
      MockSubscription::Refuse(message) => {
        info!("Mock subscription refused.");
        Ok(SubscriptionOutcome {
          success: false,
          error_message: Some(message),
          ..Default::default()
        })
      }
      MockSubscription::TransportError(message) => {
        warn!("Mock gateway transport failure.");
        Err(anyhow::anyhow!(message))
      }
    }
  }
}
