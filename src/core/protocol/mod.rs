// src/core/protocol/mod.rs

//! The document value model and its extended JSON wire format.

pub mod ext_json;
pub mod object_id;
pub mod value;

pub use ext_json::DecodeError;
pub use object_id::ObjectId;
pub use value::{Document, Value};
