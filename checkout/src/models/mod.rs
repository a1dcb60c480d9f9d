// checkout/src/models/mod.rs

//! Data carried through a checkout: the request, the cart snapshot, the
//! order header with its attribute bag, and the collaborators' payloads.

pub mod attributes;
pub mod cart;
pub mod crm;
pub mod discount;
pub mod funnel;
pub mod order;
pub mod payment;
pub mod request;

pub use attributes::{keys, AttributeBag, AttributeEntry, ScalarValue};
pub use cart::{CartIdentity, CartOwner, CartRow, LineItem};
pub use crm::{ContactDraft, ContactId, ContactUpdate, MarketingTag, TagId};
pub use discount::DiscountResult;
pub use funnel::FunnelStep;
pub use order::{OrderDraft, OrderHeader, OrderId, OrderStatus, TenantId, ORDER_RECORD_KIND};
pub use payment::{
  BillingSubset, ChargeRequest, FulfillmentStatus, GatewayKind, PaymentMethod, PaymentOutcome, PaymentStatus,
  PaymentToken, SubscriptionOutcome, SubscriptionRequest,
};
pub use request::{Address, BillingAddress, PlaceOrderRequest, PlaceOrderResponse};
