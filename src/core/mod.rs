// src/core/mod.rs

//! The central module containing the core logic and data structures of docgate.

pub mod backend;
pub mod cursor;
pub mod errors;
pub mod handler;
pub mod metrics;
pub mod operations;
pub mod protocol;
pub mod registry;
pub mod state;
pub mod tasks;

pub use errors::GatewayError;
pub use protocol::{Document, Value};
