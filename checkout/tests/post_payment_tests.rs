// tests/post_payment_tests.rs
mod common;

use checkout::models::crm::{CONTACT_SOURCE_CHECKOUT, TAG_SOURCE_PRODUCT_PURCHASE};
use checkout::models::attributes::saga_marker_key;
use checkout::models::{keys, CartOwner, ContactDraft, OrderStatus, TagId};
use checkout::pipelines::checkout_pipeline::SYNC_CRM;
use checkout::services::CrmClient;
use common::*;
use rust_decimal_macros::dec;
use serial_test::serial;

#[tokio::test]
#[serial]
async fn test_crm_outage_does_not_fail_the_order() {
  let h = Harness::new();
  h.enable_crm();
  h.backends.crm.set_unavailable(true);
  h.put_user_cart(vec![row("p1", dec!(12.50), 1.0)]);

  let response = h.orchestrator.place_order(card_request(Some("idem-crm"))).await.unwrap();

  assert!(response.success);
  assert_eq!(h.backends.orders.header(&response.order_id).unwrap().status, OrderStatus::Paid);
  assert!(h.backends.crm.contacts().is_empty());
  assert!(h
    .backends
    .orders
    .attribute(&response.order_id, &saga_marker_key(SYNC_CRM))
    .is_none());
  // Payment already happened, so the cart is still emptied.
  assert!(h.backends.carts.rows(&CartOwner::User(USER.to_string())).is_empty());
}

#[tokio::test]
#[serial]
async fn test_replay_finishes_an_interrupted_crm_sync_once() {
  let h = Harness::new();
  h.enable_crm();
  h.backends.crm.set_unavailable(true);
  h.put_user_cart(vec![row("p1", dec!(12.50), 1.0)]);
  let first = h.orchestrator.place_order(card_request(Some("idem-crm2"))).await.unwrap();

  h.backends.crm.set_unavailable(false);
  let second = h.orchestrator.place_order(card_request(Some("idem-crm2"))).await.unwrap();
  let calls_after_sync = h.backends.crm.calls();
  let third = h.orchestrator.place_order(card_request(Some("idem-crm2"))).await.unwrap();

  assert_eq!(first.order_id, second.order_id);
  assert_eq!(second.order_id, third.order_id);
  assert_eq!(h.backends.gateway.charge_count(), 1);
  assert_eq!(h.backends.crm.contacts().len(), 1);
  assert_eq!(h.backends.crm.calls(), calls_after_sync);
  assert!(h
    .backends
    .orders
    .attribute(&first.order_id, &saga_marker_key(SYNC_CRM))
    .is_some());
}

#[tokio::test]
#[serial]
async fn test_crm_disabled_makes_no_crm_calls() {
  let h = Harness::new();
  h.put_user_cart(vec![row("p1", dec!(5), 1.0)]);

  h.orchestrator.place_order(card_request(None)).await.unwrap();

  assert_eq!(h.backends.crm.calls(), 0);
}

#[tokio::test]
#[serial]
async fn test_purchase_tags_contact_by_id_and_slug() {
  let h = Harness::new();
  h.enable_crm();
  h.backends.crm.seed_tag(&h.tenant(), "tag_vip", "vip");
  h.backends.catalog.set_attribute("p1", keys::PRODUCT_CRM_TAG_IDS, r#"["tag_course"]"#);
  h.backends.catalog.set_attribute("p1", keys::PRODUCT_CRM_TAG_SLUGS, r#"[" VIP ", "early-bird"]"#);
  h.backends.catalog.set_attribute("p2", keys::PRODUCT_CRM_TAG_SLUGS, r#"["vip"]"#);
  h.put_user_cart(vec![row("p1", dec!(30), 1.0), row("p2", dec!(5), 1.0)]);

  h.orchestrator.place_order(card_request(None)).await.unwrap();

  let contacts = h.backends.crm.contacts();
  assert_eq!(contacts.len(), 1);
  let contact = &contacts[0];
  assert_eq!(contact.slug, "buyer-example-com");
  assert_eq!(contact.name, "Ada Buyer");
  assert_eq!(contact.email, EMAIL);
  assert_eq!(contact.user_id.as_deref(), Some(USER));
  assert_eq!(contact.source, CONTACT_SOURCE_CHECKOUT);

  let created = h
    .backends
    .crm
    .tags(&h.tenant())
    .into_iter()
    .find(|t| t.slug == "early-bird")
    .expect("early-bird tag created");
  let assigned: Vec<TagId> = h.backends.crm.assignments().iter().map(|a| a.tag.clone()).collect();
  assert_eq!(
    assigned,
    vec![TagId("tag_course".to_string()), TagId("tag_vip".to_string()), created.id]
  );
  assert!(h
    .backends
    .crm
    .assignments()
    .iter()
    .all(|a| a.contact == contact.id && a.source == TAG_SOURCE_PRODUCT_PURCHASE));
}

#[tokio::test]
#[serial]
async fn test_guest_purchase_refreshes_contact_found_by_email() {
  let h = Harness::new();
  h.enable_crm();
  let existing = h
    .backends
    .crm
    .create_contact(
      &h.tenant(),
      ContactDraft {
        slug: "old".to_string(),
        name: "Old Name".to_string(),
        email: "BUYER@example.com".to_string(),
        user_id: None,
        source: "import".to_string(),
      },
    )
    .await
    .unwrap();
  h.put_cart(CartOwner::Guest(GUEST.to_string()), vec![row("p1", dec!(8), 1.0)]);

  h.orchestrator.place_order(guest_request(None)).await.unwrap();

  let contacts = h.backends.crm.contacts();
  assert_eq!(contacts.len(), 1);
  assert_eq!(contacts[0].id, existing);
  assert_eq!(contacts[0].name, "Ada Buyer");
  assert_eq!(contacts[0].email, EMAIL);
  assert_eq!(contacts[0].user_id, None);
  assert_eq!(contacts[0].source, "import");
}

#[tokio::test]
#[serial]
async fn test_funnel_outage_leaves_redirect_empty() {
  let h = Harness::new();
  h.add_funnel_step(funnel_step("step_1", "checkout", 1));
  h.add_funnel_step(funnel_step("step_2", "upsell", 2));
  h.backends.funnels.set_unavailable(true);
  h.put_user_cart(vec![row("p1", dec!(5), 1.0)]);

  let mut request = card_request(None);
  request.funnel_step_id = Some("step_1".to_string());
  let response = h.orchestrator.place_order(request).await.unwrap();

  assert!(response.success);
  assert_eq!(response.redirect_url, None);
}

#[tokio::test]
#[serial]
async fn test_last_funnel_step_has_no_redirect() {
  let h = Harness::new();
  h.add_funnel_step(funnel_step("step_1", "checkout", 1));
  h.add_funnel_step(funnel_step("step_2", "thanks", 2));
  h.put_user_cart(vec![row("p1", dec!(5), 1.0)]);

  let mut request = card_request(None);
  request.funnel_step_id = Some("step_2".to_string());
  let response = h.orchestrator.place_order(request).await.unwrap();

  assert_eq!(response.redirect_url, None);
}

#[tokio::test]
#[serial]
async fn test_cart_clear_failure_is_contained() {
  let h = Harness::new();
  h.backends.carts.fail_clear(true);
  h.put_user_cart(vec![row("p1", dec!(5), 1.0)]);

  let response = h.orchestrator.place_order(card_request(None)).await.unwrap();

  assert!(response.success);
  assert_eq!(h.backends.orders.header(&response.order_id).unwrap().status, OrderStatus::Paid);
  assert_eq!(h.backends.carts.rows(&CartOwner::User(USER.to_string())).len(), 1);
  assert_eq!(h.backends.carts.clear_calls(), 1);
}

#[tokio::test]
#[serial]
async fn test_guest_cart_is_merged_and_both_carts_cleared() {
  let h = Harness::new();
  h.put_user_cart(vec![row("p1", dec!(10), 1.0)]);
  h.put_cart(
    CartOwner::Guest(GUEST.to_string()),
    vec![row("p1", dec!(10), 1.0), row("p2", dec!(2.50), 2.0)],
  );

  let mut request = card_request(None);
  request.guest_session_id = Some(GUEST.to_string());
  let response = h.orchestrator.place_order(request).await.unwrap();

  assert_eq!(h.backends.gateway.charges()[0].amount, dec!(25));
  assert_eq!(h.backends.gateway.charges()[0].order_id, response.order_id);
  assert!(h.backends.carts.rows(&CartOwner::User(USER.to_string())).is_empty());
  assert!(h.backends.carts.rows(&CartOwner::Guest(GUEST.to_string())).is_empty());
  assert_eq!(h.backends.carts.clear_calls(), 2);
}
