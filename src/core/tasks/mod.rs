// src/core/tasks/mod.rs

//! Long-running background tasks that maintain gateway state.

pub mod cursor_reaper;
