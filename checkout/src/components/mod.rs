// checkout/src/components/mod.rs

//! The checkout's building blocks. Each module owns one concern and talks to
//! collaborators only through the traits in [`crate::services`].

pub mod cart;
pub mod crm_sync;
pub mod eligibility;
pub mod funnel;
pub mod idempotency;
pub mod order_store;
pub mod payment;
pub mod pricing;
pub mod subscription;

pub use idempotency::PriorOrder;
pub use payment::SettlementPlan;
pub use pricing::PricedOrder;
pub use subscription::SubscriptionTerms;
