// checkout/src/services/discounts.rs

//! Discount validation contract and a rule-table implementation.

use crate::models::{DiscountResult, TenantId};
use async_trait::async_trait;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::HashMap;

#[async_trait]
pub trait DiscountValidator: Send + Sync {
  async fn validate(&self, tenant: &TenantId, code: &str, subtotal: Decimal) -> anyhow::Result<DiscountResult>;
}

#[derive(Debug, Clone)]
pub enum DiscountRule {
  /// Percentage of the subtotal, e.g. `10` for 10%.
  Percent(Decimal),
  Fixed(Decimal),
  /// Known code that is currently not usable (expired, exhausted...).
  Rejected(String),
  /// Hands back whatever result it holds, unvalidated.
  Raw(DiscountResult),
}

/// Codes are matched case-insensitively and canonicalized to upper case.
#[derive(Default)]
pub struct InMemoryDiscountValidator {
  rules: RwLock<HashMap<String, DiscountRule>>,
}

impl InMemoryDiscountValidator {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn add_rule(&self, code: &str, rule: DiscountRule) {
    self.rules.write().insert(code.trim().to_uppercase(), rule);
  }
}

#[async_trait]
impl DiscountValidator for InMemoryDiscountValidator {
  async fn validate(&self, _tenant: &TenantId, code: &str, subtotal: Decimal) -> anyhow::Result<DiscountResult> {
    let canonical = code.trim().to_uppercase();
    let rule = self.rules.read().get(&canonical).cloned();
    let result = match rule {
      None => DiscountResult::rejected("Coupon code not found."),
      Some(DiscountRule::Percent(pct)) => {
        let amount = subtotal
          .checked_mul(pct)
          .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
          .ok_or_else(|| anyhow::anyhow!("discount overflow for code {}", canonical))?
          .round_dp(2);
        DiscountResult::accepted(canonical, amount)
      }
      Some(DiscountRule::Fixed(amount)) => DiscountResult::accepted(canonical, amount),
      Some(DiscountRule::Rejected(reason)) => DiscountResult::rejected(reason),
      Some(DiscountRule::Raw(result)) => result,
    };
    Ok(result)
  }
}
