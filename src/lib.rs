// src/lib.rs

pub mod config;
pub mod core;
pub mod server;
