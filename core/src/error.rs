// checkout_saga/src/error.rs
use anyhow::Error as AnyhowError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SagaError {
  #[error("Handler missing for required step: {step_name}")]
  HandlerMissing { step_name: String },

  #[error("Journal failed for step '{step_name}'. Source: {source}")]
  JournalFailure {
    step_name: String,
    #[source]
    source: AnyhowError,
  },

  #[error("Error in handler or external operation. Source: {source}")]
  HandlerError {
    #[source]
    source: AnyhowError,
  },

  #[error("Configuration error for step '{step_name}': {message}")]
  ConfigurationError { step_name: String, message: String },

  #[error("Internal saga error: {0}")]
  Internal(String),
}

// Handlers that work in anyhow can `?` straight into a SagaError.
impl From<AnyhowError> for SagaError {
  fn from(err: AnyhowError) -> Self {
    SagaError::HandlerError { source: err }
  }
}

pub type SagaResult<T, E = SagaError> = std::result::Result<T, E>;
