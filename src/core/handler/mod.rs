// src/core/handler/mod.rs

//! Request handling independent of the HTTP transport: path routing, argument
//! normalization, operation dispatch and reply rendering.

pub mod args;
pub mod dispatcher;
pub mod reply;
pub mod router;
