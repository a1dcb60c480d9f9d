// checkout/src/models/discount.rs

use rust_decimal::Decimal;

/// Answer of the external discount validator.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DiscountResult {
  pub ok: bool,
  /// The code as the validator canonicalized it.
  pub applied_code: Option<String>,
  pub discount_amount: Option<Decimal>,
  pub reason: Option<String>,
}

impl DiscountResult {
  pub fn accepted(code: impl Into<String>, amount: Decimal) -> Self {
    Self {
      ok: true,
      applied_code: Some(code.into()),
      discount_amount: Some(amount),
      reason: None,
    }
  }

  pub fn rejected(reason: impl Into<String>) -> Self {
    Self {
      ok: false,
      reason: Some(reason.into()),
      ..Default::default()
    }
  }
}
