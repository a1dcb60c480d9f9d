// checkout/src/pipelines/mod.rs

//! The checkout saga: its context, its step handlers, and the journal that
//! keeps step completion on the order.

pub mod checkout_pipeline;
pub mod checkout_steps;
pub mod contexts;
pub mod journal;

pub use checkout_pipeline::build_checkout_saga;
pub use contexts::CheckoutCtxData;
pub use journal::OrderAttributeJournal;
