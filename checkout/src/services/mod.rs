// checkout/src/services/mod.rs

//! Collaborators the checkout talks to, each as an async trait with an
//! in-memory implementation used by the demo binary and the tests.

pub mod cart_store;
pub mod catalog;
pub mod crm;
pub mod discounts;
pub mod funnels;
pub mod orders;
pub mod payment_mock;
pub mod settings;

pub use cart_store::{CartStore, InMemoryCartStore};
pub use catalog::{InMemoryCatalog, ProductAttributes, ProductCatalog};
pub use crm::{CrmClient, InMemoryCrm};
pub use discounts::{DiscountRule, DiscountValidator, InMemoryDiscountValidator};
pub use funnels::{FunnelStore, InMemoryFunnels};
pub use orders::{InMemoryOrderRepository, OrderRepository, OrderStoreError};
pub use payment_mock::{MockCharge, MockPaymentGateway, MockSubscription, PaymentGateway};
pub use settings::{InMemorySettings, SettingsStore};
