// checkout/src/config.rs

use crate::errors::{CheckoutError, Result};
use chrono::Duration;
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
  Text,
  Json,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
  /// Used when a tenant has no `defaultCurrency` in its ecommerce settings.
  pub default_currency: String,
  pub log_format: LogFormat,
  /// JSON `PlaceOrderRequest` the demo binary submits instead of its built-in one.
  pub demo_request_path: Option<PathBuf>,
  /// How old an `unpaid` order with the same idempotency key must be before
  /// a retry may resume it. Younger ones are treated as still in flight.
  pub resume_after: Duration,
}

const DEFAULT_RESUME_AFTER_SECS: i64 = 120;
const MAX_RESUME_AFTER_SECS: i64 = 7 * 24 * 60 * 60;

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      default_currency: "USD".to_string(),
      log_format: LogFormat::Text,
      demo_request_path: None,
      resume_after: Duration::seconds(DEFAULT_RESUME_AFTER_SECS),
    }
  }
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok();

    let get_env = |var_name: &str| env::var(var_name).ok().filter(|v| !v.trim().is_empty());

    let default_currency = match get_env("CHECKOUT_DEFAULT_CURRENCY") {
      Some(raw) => parse_currency(&raw)?,
      None => "USD".to_string(),
    };

    let log_format = match get_env("CHECKOUT_LOG_FORMAT").as_deref().map(str::trim) {
      None | Some("text") => LogFormat::Text,
      Some("json") => LogFormat::Json,
      Some(other) => {
        return Err(CheckoutError::Config(format!(
          "Invalid CHECKOUT_LOG_FORMAT '{}': expected 'text' or 'json'",
          other
        )))
      }
    };

    let demo_request_path = get_env("CHECKOUT_DEMO_REQUEST").map(PathBuf::from);

    let resume_after_secs = match get_env("CHECKOUT_RESUME_AFTER_SECS") {
      Some(raw) => parse_seconds("CHECKOUT_RESUME_AFTER_SECS", &raw)?,
      None => DEFAULT_RESUME_AFTER_SECS,
    };
    let resume_after = Duration::seconds(resume_after_secs);

    tracing::info!(
      %default_currency,
      ?log_format,
      resume_after_secs,
      "Application configuration loaded successfully."
    );

    Ok(Self {
      default_currency,
      log_format,
      demo_request_path,
      resume_after,
    })
  }
}

fn parse_seconds(var_name: &str, raw: &str) -> Result<i64> {
  raw
    .trim()
    .parse::<i64>()
    .ok()
    .filter(|secs| (1..=MAX_RESUME_AFTER_SECS).contains(secs))
    .ok_or_else(|| {
      CheckoutError::Config(format!(
        "Invalid {} '{}': expected whole seconds between 1 and {}",
        var_name, raw, MAX_RESUME_AFTER_SECS
      ))
    })
}

fn parse_currency(raw: &str) -> Result<String> {
  let code = raw.trim().to_ascii_uppercase();
  if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
    return Err(CheckoutError::Config(format!(
      "Invalid CHECKOUT_DEFAULT_CURRENCY '{}': expected a three-letter currency code",
      raw
    )));
  }
  Ok(code)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn currency_codes_are_normalized() {
    assert_eq!(parse_currency(" eur ").unwrap(), "EUR");
  }

  #[test]
  fn malformed_currency_is_a_config_error() {
    assert!(matches!(parse_currency("dollars"), Err(CheckoutError::Config(_))));
    assert!(matches!(parse_currency("U$D"), Err(CheckoutError::Config(_))));
  }

  #[test]
  fn resume_window_is_bounded() {
    assert_eq!(parse_seconds("X", " 30 ").unwrap(), 30);
    assert!(matches!(parse_seconds("X", "-1"), Err(CheckoutError::Config(_))));
    assert!(matches!(parse_seconds("X", "0"), Err(CheckoutError::Config(_))));
    assert!(matches!(parse_seconds("X", "soon"), Err(CheckoutError::Config(_))));
    assert!(matches!(parse_seconds("X", "99999999999"), Err(CheckoutError::Config(_))));
  }
}
