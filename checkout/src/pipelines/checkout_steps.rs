// checkout/src/pipelines/checkout_steps.rs

//! Handlers of the checkout saga, one per step.
//!
//! Every handler copies what it needs out of the context, does its I/O with
//! no lock held, then writes its results back.

use crate::components::cart::{self, unique_product_ids};
use crate::components::crm_sync::{self, Purchaser};
use crate::components::order_store::{self, OrderFacts};
use crate::components::payment::{self, Settlement};
use crate::components::subscription::{self, RecurringBilling};
use crate::components::{eligibility, funnel, idempotency, pricing, PriorOrder};
use crate::errors::{CheckoutError, Result};
use crate::models::{keys, BillingSubset, PaymentMethod};
use crate::pipelines::contexts::CheckoutCtxData;
use crate::services::settings::ECOMMERCE_SETTINGS_OPTION;
use checkout_saga::{SagaContext, StepControl};
use chrono::Utc;
use tracing::{debug, info, instrument, warn};

type Ctx = SagaContext<CheckoutCtxData>;

fn missing(what: &str) -> CheckoutError {
  CheckoutError::Workflow {
    source: checkout_saga::SagaError::Internal(format!("{} not set by an earlier step", what)),
  }
}

#[instrument(name = "checkout_step::resolve_idempotency", skip_all)]
pub async fn resolve_idempotency(ctx: Ctx) -> Result<StepControl> {
  let (orders, tenant, request, attempt, now, resume_after) = ctx.with(|c| {
    (
      c.app_state.orders.clone(),
      c.tenant.clone(),
      c.request.clone(),
      c.attempt.clone(),
      c.now,
      c.app_state.config.resume_after,
    )
  });

  let prior = idempotency::resolve_existing(
    orders.as_ref(),
    &tenant,
    request.idempotency_key(),
    &attempt,
    now,
    resume_after,
  )
  .await?;

  // A replay still finishes its post-payment steps, which need the purchased products.
  let replay_items = match &prior {
    PriorOrder::Replay(order_id) => Some(order_store::load_line_items(orders.as_ref(), order_id).await?),
    PriorOrder::Resume(_) | PriorOrder::None => None,
  };

  ctx.update(|c| {
    c.order_id = prior.order_id().cloned();
    if let Some(items) = replay_items {
      c.product_ids = unique_product_ids(&items);
      c.items = items;
    }
    c.prior = prior;
  });
  Ok(StepControl::Continue)
}

#[instrument(name = "checkout_step::load_settings", skip_all)]
pub async fn load_settings(ctx: Ctx) -> Result<StepControl> {
  let (settings, tenant, fallback_currency) =
    ctx.with(|c| (c.app_state.settings.clone(), c.tenant.clone(), c.app_state.config.default_currency.clone()));

  let ecommerce = settings.get_option(&tenant, ECOMMERCE_SETTINGS_OPTION).await?;
  let currency = ecommerce
    .as_ref()
    .and_then(|v| v.get("defaultCurrency"))
    .and_then(serde_json::Value::as_str)
    .map(str::trim)
    .filter(|c| !c.is_empty())
    .map(str::to_string)
    .unwrap_or(fallback_currency);

  let tenant_slug = match settings.tenant_slug(&tenant).await {
    Ok(slug) => slug.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
    Err(e) => {
      warn!(error = %e, "Could not load tenant slug; order will not carry it.");
      None
    }
  };

  debug!(%currency, ?tenant_slug, "Tenant settings loaded.");
  ctx.update(|c| {
    c.currency = currency;
    c.tenant_slug = tenant_slug;
  });
  Ok(StepControl::Continue)
}

#[instrument(name = "checkout_step::load_cart", skip_all)]
pub async fn load_cart(ctx: Ctx) -> Result<StepControl> {
  let (carts, identity) = ctx.with(|c| (c.app_state.carts.clone(), c.identity.clone()));
  let items = cart::load_snapshot(carts.as_ref(), &identity).await?;
  ctx.update(|c| {
    c.product_ids = unique_product_ids(&items);
    c.items = items;
  });
  Ok(StepControl::Continue)
}

#[instrument(name = "checkout_step::check_eligibility", skip_all)]
pub async fn check_eligibility(ctx: Ctx) -> Result<StepControl> {
  let (catalog, tenant, product_ids, mut cache, user_id) = ctx.with(|c| {
    (
      c.app_state.catalog.clone(),
      c.tenant.clone(),
      c.product_ids.clone(),
      c.product_attributes.clone(),
      c.identity.user_id().map(str::to_string),
    )
  });

  eligibility::fill_attribute_cache(catalog.as_ref(), &tenant, &product_ids, &mut cache).await?;
  let requires_account = eligibility::requires_account(&product_ids, &cache);
  ctx.update(|c| {
    c.product_attributes = cache;
    c.requires_account = requires_account;
  });
  eligibility::enforce(requires_account, user_id.as_deref())?;
  Ok(StepControl::Continue)
}

/// A subscription cart is replaced by its single initial-charge line.
#[instrument(name = "checkout_step::detect_subscription", skip_all)]
pub async fn detect_subscription(ctx: Ctx) -> Result<StepControl> {
  let terms = ctx.with(|c| subscription::detect(&c.items, &c.product_attributes, c.now.date_naive()))?;
  if let Some(terms) = terms {
    info!(
      product_id = %terms.product_id,
      initial_charge = %terms.initial_charge,
      start_date = %terms.start_date,
      "Subscription checkout."
    );
    ctx.update(|c| {
      c.items = terms.line_items();
      c.subscription = Some(terms);
    });
  }
  Ok(StepControl::Continue)
}

#[instrument(name = "checkout_step::price_order", skip_all)]
pub async fn price_order(ctx: Ctx) -> Result<StepControl> {
  let (discounts, tenant, items, request) =
    ctx.with(|c| (c.app_state.discounts.clone(), c.tenant.clone(), c.items.clone(), c.request.clone()));
  let priced = pricing::price(discounts.as_ref(), &tenant, &items, request.coupon_code()).await?;
  ctx.update(|c| c.pricing = Some(priced));
  Ok(StepControl::Continue)
}

/// Settles on a payment plan before any order row is written, so an
/// unusable method or a missing token leaves nothing behind.
#[instrument(name = "checkout_step::resolve_payment", skip_all)]
pub async fn resolve_payment(ctx: Ctx) -> Result<StepControl> {
  let (request, total, terms) =
    ctx.with(|c| (c.request.clone(), c.pricing.as_ref().map(|p| p.total), c.subscription.clone()));
  let total = total.ok_or_else(|| missing("pricing"))?;

  let method: PaymentMethod = request.payment_method_id.parse()?;
  let plan = payment::plan_settlement(method, total, request.payment_data.as_ref(), terms)?;
  debug!(%method, free = plan.is_free(), "Payment plan resolved.");
  ctx.update(|c| {
    c.method = Some(method);
    c.plan = Some(plan);
  });
  Ok(StepControl::Continue)
}

#[instrument(name = "checkout_step::create_draft", skip_all)]
pub async fn create_draft(ctx: Ctx) -> Result<StepControl> {
  let (orders, tenant, now, request, attempt) = ctx.with(|c| {
    (
      c.app_state.orders.clone(),
      c.tenant.clone(),
      c.now,
      c.request.clone(),
      c.attempt.clone(),
    )
  });
  let order_id =
    order_store::create_draft(orders.as_ref(), &tenant, now, request.idempotency_key(), &attempt).await?;
  ctx.update(|c| c.order_id = Some(order_id));
  Ok(StepControl::Continue)
}

/// A resumed order also gets every optional key the new submission leaves
/// out reset to null, so nothing from the abandoned attempt survives.
#[instrument(name = "checkout_step::persist_attributes", skip_all)]
pub async fn persist_attributes(ctx: Ctx) -> Result<StepControl> {
  let (orders, order_id, resuming, mut bag) = ctx.with(|c| -> Result<_> {
    let order_id = c.order_id.clone().ok_or_else(|| missing("order id"))?;
    let pricing = c.pricing.as_ref().ok_or_else(|| missing("pricing"))?;
    let method = c.method.ok_or_else(|| missing("payment method"))?;
    let plan = c.plan.as_ref().ok_or_else(|| missing("payment plan"))?;
    let facts = OrderFacts {
      items: &c.items,
      pricing,
      currency: &c.currency,
      method,
      plan,
      idempotency_key: c.request.idempotency_key(),
      email: &c.request.email,
      user_id: c.identity.user_id(),
      billing: &c.request.billing,
      shipping: &c.request.shipping,
      requires_account: c.requires_account,
      tenant_slug: c.tenant_slug.as_deref(),
    };
    Ok((
      c.app_state.orders.clone(),
      order_id,
      matches!(c.prior, PriorOrder::Resume(_)),
      order_store::build_attribute_bag(&facts)?,
    ))
  })?;

  if resuming {
    bag.null_absent(keys::OPTIONAL);
  }
  order_store::write_attributes(orders.as_ref(), &order_id, bag).await?;
  Ok(StepControl::Continue)
}

/// Renews the settlement lease right before money moves, so a submission
/// that stalled past the lease cannot charge an order another one resumed.
#[instrument(name = "checkout_step::settle_payment", skip_all)]
pub async fn settle_payment(ctx: Ctx) -> Result<StepControl> {
  let (orders, gateway, attempt, lease, tenant, order_id, plan, total, currency, billing) = ctx.with(|c| -> Result<_> {
    Ok((
      c.app_state.orders.clone(),
      c.app_state.gateway.clone(),
      c.attempt.clone(),
      c.app_state.config.resume_after,
      c.tenant.clone(),
      c.order_id.clone().ok_or_else(|| missing("order id"))?,
      c.plan.clone().ok_or_else(|| missing("payment plan"))?,
      c.pricing.as_ref().map(|p| p.total).ok_or_else(|| missing("pricing"))?,
      c.currency.clone(),
      BillingSubset {
        name: c.request.billing.address.name().map(str::to_string),
        postcode: c.request.billing.address.postcode().map(str::to_string),
      },
    ))
  })?;

  order_store::take_settlement_lease(orders.as_ref(), &order_id, &attempt, Utc::now(), lease).await?;
  let settlement = Settlement {
    tenant: &tenant,
    order_id: &order_id,
    plan: &plan,
    total,
    currency: &currency,
    billing,
  };
  let outcome = payment::settle(orders.as_ref(), gateway.as_ref(), settlement).await?;
  ctx.update(|c| c.outcome = Some(outcome));
  Ok(StepControl::Continue)
}

#[instrument(name = "checkout_step::start_subscription", skip_all)]
pub async fn start_subscription(ctx: Ctx) -> Result<StepControl> {
  let (orders, gateway, tenant, order_id, plan, request, currency) = ctx.with(|c| -> Result<_> {
    Ok((
      c.app_state.orders.clone(),
      c.app_state.gateway.clone(),
      c.tenant.clone(),
      c.order_id.clone().ok_or_else(|| missing("order id"))?,
      c.plan.clone().ok_or_else(|| missing("payment plan"))?,
      c.request.clone(),
      c.currency.clone(),
    ))
  })?;
  let Some((terms, token)) = plan.subscription() else {
    return Ok(StepControl::Continue);
  };

  let billing = RecurringBilling {
    tenant: &tenant,
    order_id: &order_id,
    token,
    terms,
    email: &request.email,
    currency: &currency,
    billing: BillingSubset {
      name: request.billing.address.name().map(str::to_string),
      postcode: request.billing.address.postcode().map(str::to_string),
    },
  };
  subscription::open_recurring_billing(orders.as_ref(), gateway.as_ref(), billing).await?;
  Ok(StepControl::Continue)
}

#[instrument(name = "checkout_step::sync_crm", skip_all)]
pub async fn sync_crm(ctx: Ctx) -> Result<StepControl> {
  let (state, tenant, request, user_id, product_ids, mut cache, now) = ctx.with(|c| {
    (
      c.app_state.clone(),
      c.tenant.clone(),
      c.request.clone(),
      c.identity.user_id().map(str::to_string),
      c.product_ids.clone(),
      c.product_attributes.clone(),
      c.now,
    )
  });

  if !crm_sync::crm_enabled(state.settings.as_ref(), &tenant).await? {
    debug!("CRM sync disabled for tenant.");
    return Ok(StepControl::Continue);
  }

  eligibility::fill_attribute_cache(state.catalog.as_ref(), &tenant, &product_ids, &mut cache).await?;
  let purchaser = Purchaser {
    email: &request.email,
    user_id: user_id.as_deref(),
    billing_name: request.billing.address.name(),
    shipping_name: request.shipping.name(),
  };
  crm_sync::sync_purchase(state.crm.as_ref(), &tenant, &purchaser, &product_ids, &cache, now).await?;
  ctx.update(|c| c.product_attributes = cache);
  Ok(StepControl::Continue)
}

#[instrument(name = "checkout_step::clear_cart", skip_all)]
pub async fn clear_cart(ctx: Ctx) -> Result<StepControl> {
  let (carts, identity) = ctx.with(|c| (c.app_state.carts.clone(), c.identity.clone()));
  cart::clear_carts(carts.as_ref(), &identity).await?;
  info!("Cart cleared after payment.");
  Ok(StepControl::Continue)
}

#[instrument(name = "checkout_step::route_funnel", skip_all)]
pub async fn route_funnel(ctx: Ctx) -> Result<StepControl> {
  let (funnels, tenant, request, order_id) = ctx.with(|c| {
    (
      c.app_state.funnels.clone(),
      c.tenant.clone(),
      c.request.clone(),
      c.order_id.clone(),
    )
  });
  let (Some(step_id), Some(order_id)) = (request.funnel_step_id(), order_id) else {
    return Ok(StepControl::Continue);
  };

  let redirect_url = funnel::next_step_url(funnels.as_ref(), &tenant, step_id, &order_id).await?;
  ctx.update(|c| c.redirect_url = redirect_url);
  Ok(StepControl::Continue)
}
