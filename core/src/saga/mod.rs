// checkout_saga/src/saga/mod.rs

//! Defines the `Saga<TData, Err>` struct, its construction, handler registration and execution.

pub mod definition;
pub mod execution;
pub mod hooks;

pub use definition::Saga;
