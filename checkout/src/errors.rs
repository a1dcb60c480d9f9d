// checkout/src/errors.rs

use checkout_saga::SagaError;
use thiserror::Error;

/// Message returned to the buyer for any gateway failure. The gateway's own
/// decline reason is persisted on the order and never leaves this crate.
pub const GENERIC_PAYMENT_FAILURE: &str = "Payment failed. Please try again or use a different payment method.";

#[derive(Debug, Error)]
pub enum CheckoutError {
  #[error("Missing cart identity")]
  MissingCartIdentity,

  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Cart is empty")]
  CartEmpty,

  #[error("An account is required to purchase one or more items in this cart")]
  AccountRequired,

  #[error("Invalid order total")]
  InvalidTotal,

  #[error("{0}")]
  InvalidCoupon(String),

  #[error("Missing payment token")]
  MissingPaymentToken,

  #[error("Unsupported payment method: {0}")]
  UnsupportedPaymentMethod(String),

  /// A subscription product that cannot be checked out as configured or as carted.
  #[error("{0}")]
  InvalidSubscription(String),

  #[error("An order with this idempotency key is already being placed")]
  DuplicateSubmission,

  #[error("Payment failed. Please try again or use a different payment method.")]
  PaymentDeclined,

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Collaborator failure: {source}")]
  Service {
    #[source]
    source: anyhow::Error,
  },

  #[error("Checkout workflow error: {source}")]
  Workflow {
    #[from]
    source: SagaError,
  },
}

impl CheckoutError {
  /// True for failures raised before any order row exists.
  pub fn is_precondition(&self) -> bool {
    matches!(
      self,
      CheckoutError::MissingCartIdentity
        | CheckoutError::Validation(_)
        | CheckoutError::CartEmpty
        | CheckoutError::AccountRequired
        | CheckoutError::InvalidTotal
        | CheckoutError::InvalidCoupon(_)
        | CheckoutError::MissingPaymentToken
        | CheckoutError::UnsupportedPaymentMethod(_)
        | CheckoutError::InvalidSubscription(_)
        | CheckoutError::DuplicateSubmission
    )
  }
}

// Collaborators speak anyhow; whatever they return is a service failure.
impl From<anyhow::Error> for CheckoutError {
  fn from(err: anyhow::Error) -> Self {
    match err.downcast::<CheckoutError>() {
      Ok(checkout_err) => checkout_err,
      Err(source) => CheckoutError::Service { source },
    }
  }
}

pub type Result<T, E = CheckoutError> = std::result::Result<T, E>;
