// checkout/src/lib.rs

//! Order placement for a multi-tenant storefront.
//!
//! [`CheckoutOrchestrator::place_order`] snapshots the buyer's cart, prices
//! it, writes an order with its attribute bag, settles payment, and then runs
//! the post-payment work (CRM tagging, cart clearing, funnel redirect) whose
//! failures never undo a paid order.

pub mod components;
pub mod config;
pub mod errors;
pub mod models;
pub mod orchestrator;
pub mod pipelines;
pub mod services;
pub mod state;

pub use config::{AppConfig, LogFormat};
pub use errors::{CheckoutError, Result, GENERIC_PAYMENT_FAILURE};
pub use orchestrator::CheckoutOrchestrator;
pub use state::{AppState, InMemoryBackends};
