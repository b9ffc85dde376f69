// src/core/handler/router.rs

//! Turns a REST path into a database, an optional collection and an operation name.
//!
//! The last path segment names the operation and must start with `_`. A single
//! segment targets the `admin` database. With three or more segments, everything
//! between the first and the last is joined with `.` to form the collection, so
//! `/test/system/users/_find` reads collection `system.users` of `test`.

use thiserror::Error;

/// The database used for paths that name only an operation.
pub const ADMIN_DB: &str = "admin";

/// The components of a routed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub db: String,
    pub collection: Option<String>,
    /// The operation segment, including its leading underscore.
    pub operation: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    #[error("Script Not Found: {0}")]
    NotFound(String),
}

/// Parses `path` (leading and trailing slashes ignored).
pub fn route_path(path: &str) -> Result<Route, RouteError> {
    let trimmed = path.trim_matches('/');
    let not_found = || RouteError::NotFound(trimmed.to_string());

    let parts: Vec<&str> = trimmed.split('/').collect();
    let (operation, prefix) = parts.split_last().ok_or_else(not_found)?;
    if !operation.starts_with('_') {
        return Err(not_found());
    }

    let route = match prefix {
        [] => Route {
            db: ADMIN_DB.to_string(),
            collection: None,
            operation: operation.to_string(),
        },
        [db] => Route {
            db: db.to_string(),
            collection: None,
            operation: operation.to_string(),
        },
        [db, collection @ ..] => Route {
            db: db.to_string(),
            collection: Some(collection.join(".")),
            operation: operation.to_string(),
        },
    };
    Ok(route)
}
