// checkout/src/components/pricing.rs

//! Subtotal, discount and total of a cart snapshot.

use crate::errors::{CheckoutError, Result};
use crate::models::{DiscountResult, LineItem, TenantId};
use crate::services::DiscountValidator;
use rust_decimal::Decimal;
use tracing::{debug, instrument, warn};

const GENERIC_COUPON_REJECTION: &str = "Invalid coupon code.";

#[derive(Debug, Clone, PartialEq)]
pub struct PricedOrder {
  pub subtotal: Decimal,
  /// Always within `0..=subtotal`.
  pub discount: Decimal,
  pub total: Decimal,
  pub applied_code: Option<String>,
}

/// Sum of `unit_price * quantity`. Must be strictly positive.
pub fn subtotal(items: &[LineItem]) -> Result<Decimal> {
  let sum = items.iter().try_fold(Decimal::ZERO, |acc, item| {
    item.line_total().and_then(|line| acc.checked_add(line))
  });
  match sum {
    Some(s) if s > Decimal::ZERO => Ok(s),
    _ => Err(CheckoutError::InvalidTotal),
  }
}

/// Turns a validator answer into final amounts, clamping the discount to
/// `[0, subtotal]`.
pub fn apply_discount(subtotal: Decimal, requested_code: &str, result: DiscountResult) -> Result<PricedOrder> {
  if !result.ok {
    let reason = result
      .reason
      .map(|r| r.trim().to_string())
      .filter(|r| !r.is_empty())
      .unwrap_or_else(|| GENERIC_COUPON_REJECTION.to_string());
    return Err(CheckoutError::InvalidCoupon(reason));
  }

  let raw = result.discount_amount.unwrap_or(Decimal::ZERO);
  let discount = raw.clamp(Decimal::ZERO, subtotal);
  if discount != raw {
    warn!(%raw, %discount, "Discount amount clamped to the subtotal range.");
  }
  let applied_code = result
    .applied_code
    .map(|c| c.trim().to_string())
    .filter(|c| !c.is_empty())
    .unwrap_or_else(|| requested_code.to_string());

  Ok(PricedOrder {
    subtotal,
    discount,
    total: subtotal - discount,
    applied_code: Some(applied_code),
  })
}

#[instrument(name = "pricing::price", skip(discounts, items), fields(tenant = %tenant, coupon = ?coupon_code))]
pub async fn price(
  discounts: &dyn DiscountValidator,
  tenant: &TenantId,
  items: &[LineItem],
  coupon_code: Option<&str>,
) -> Result<PricedOrder> {
  let subtotal = subtotal(items)?;
  let priced = match coupon_code.map(str::trim).filter(|c| !c.is_empty()) {
    Some(code) => {
      let result = discounts.validate(tenant, code, subtotal).await?;
      apply_discount(subtotal, code, result)?
    }
    None => PricedOrder {
      subtotal,
      discount: Decimal::ZERO,
      total: subtotal,
      applied_code: None,
    },
  };
  debug!(subtotal = %priced.subtotal, discount = %priced.discount, total = %priced.total, "Order priced.");
  Ok(priced)
}

#[cfg(test)]
mod tests {
  use super::*;
  use rust_decimal_macros::dec;

  fn item(price: Decimal, qty: u32) -> LineItem {
    LineItem {
      product_id: "p".to_string(),
      title: "P".to_string(),
      unit_price: price,
      quantity: qty,
    }
  }

  #[test]
  fn subtotal_is_exact() {
    let items = vec![item(dec!(0.10), 3), item(dec!(19.99), 2)];
    assert_eq!(subtotal(&items).unwrap(), dec!(40.28));
  }

  #[test]
  fn non_positive_or_overflowing_subtotal_is_invalid() {
    assert!(matches!(subtotal(&[]), Err(CheckoutError::InvalidTotal)));
    assert!(matches!(subtotal(&[item(dec!(0), 4)]), Err(CheckoutError::InvalidTotal)));
    assert!(matches!(
      subtotal(&[item(Decimal::MAX, 2)]),
      Err(CheckoutError::InvalidTotal)
    ));
  }

  #[test]
  fn total_never_goes_below_zero() {
    let over = apply_discount(dec!(30), "big", DiscountResult::accepted("BIG", dec!(45))).unwrap();
    assert_eq!(over.discount, dec!(30));
    assert_eq!(over.total, dec!(0));
    assert_eq!(over.applied_code.as_deref(), Some("BIG"));

    let negative = apply_discount(dec!(30), "odd", DiscountResult::accepted("ODD", dec!(-5))).unwrap();
    assert_eq!(negative.discount, dec!(0));
    assert_eq!(negative.total, dec!(30));
  }

  #[test]
  fn pricing_invariant_holds_across_amounts() {
    let subtotal = dec!(57.35);
    for raw in [dec!(-1), dec!(0), dec!(0.01), dec!(20), dec!(57.35), dec!(57.36), dec!(1000)] {
      let priced = apply_discount(subtotal, "c", DiscountResult::accepted("C", raw)).unwrap();
      assert!(priced.discount >= dec!(0) && priced.discount <= subtotal);
      assert_eq!(priced.total, (subtotal - raw).max(dec!(0)).min(subtotal));
    }
  }

  #[test]
  fn rejection_uses_validator_reason_or_generic_message() {
    match apply_discount(dec!(10), "x", DiscountResult::rejected("Coupon expired.")) {
      Err(CheckoutError::InvalidCoupon(reason)) => assert_eq!(reason, "Coupon expired."),
      other => panic!("unexpected {:?}", other),
    }
    let silent = DiscountResult {
      ok: false,
      ..Default::default()
    };
    match apply_discount(dec!(10), "x", silent) {
      Err(CheckoutError::InvalidCoupon(reason)) => assert_eq!(reason, "Invalid coupon code."),
      other => panic!("unexpected {:?}", other),
    }
  }

  #[test]
  fn canonical_code_falls_back_to_the_requested_one() {
    let result = DiscountResult {
      ok: true,
      discount_amount: Some(dec!(1)),
      ..Default::default()
    };
    let priced = apply_discount(dec!(10), "save1", result).unwrap();
    assert_eq!(priced.applied_code.as_deref(), Some("save1"));
  }
}
