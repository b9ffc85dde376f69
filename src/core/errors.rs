// src/core/errors.rs

//! Defines the error type every operation reports through.
//!
//! No error ever leaves a request: each `GatewayError` renders as an `ok: 0`
//! envelope carrying an `errmsg`, plus whatever context fields the failure has
//! (the connection `name`, the `server` that could not be reached, the echoed `cmd`).

use crate::core::backend::{BackendError, DUPLICATE_KEY_CODE};
use crate::core::cursor::CursorError;
use crate::core::handler::args::Method;
use crate::core::protocol::{DecodeError, Document, Value};
use crate::core::registry::ConnectError;
use crate::doc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    /// A JSON argument could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// A required argument is missing or unusable.
    #[error("{0}")]
    InvalidArgument(String),

    #[error("{operation} must be a {expected} request")]
    WrongMethod {
        operation: &'static str,
        expected: Method,
    },

    /// The named connection does not exist and cannot be created implicitly.
    #[error("couldn't get connection to mongo")]
    NoConnection { name: String },

    #[error("could not connect")]
    ConnectFailed { server: String, name: String },

    /// A connectivity failure that a fresh connection could not repair.
    #[error("wasn't connected to the db and couldn't reconnect")]
    ConnectionLost { name: String },

    /// A connectivity failure after which the connection was re-established.
    /// The client may simply retry.
    #[error("auto reconnecting, please try again")]
    RetryAfterReconnect,

    #[error("couldn't find the cursor with id {0}")]
    CursorNotFound(u64),

    /// The backend rejected the operation. The message is passed through verbatim.
    #[error("{message}")]
    Backend {
        message: String,
        code: Option<i32>,
    },

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("Script Not Found: {0}")]
    UnknownOperation(String),

    #[error("{0}")]
    Internal(String),
}

impl GatewayError {
    pub fn invalid(message: impl Into<String>) -> Self {
        GatewayError::InvalidArgument(message.into())
    }

    /// True for failures caused by losing the backend, which a client may retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GatewayError::RetryAfterReconnect | GatewayError::ConnectionLost { .. }
        )
    }

    /// Renders the error as an `ok: 0` envelope.
    pub fn into_envelope(self) -> Document {
        let mut envelope = doc! { "ok" => 0, "errmsg" => self.to_string() };
        match self {
            GatewayError::ConnectFailed { server, name } => {
                envelope.insert("server".to_string(), Value::from(server));
                envelope.insert("name".to_string(), Value::from(name));
            }
            GatewayError::ConnectionLost { name } => {
                envelope.insert("name".to_string(), Value::from(name));
            }
            GatewayError::Backend {
                code: Some(code), ..
            } => {
                envelope.insert("code".to_string(), Value::from(code));
            }
            _ => {}
        }
        envelope
    }
}

impl From<BackendError> for GatewayError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::DuplicateKey { message } => GatewayError::Backend {
                message,
                code: Some(DUPLICATE_KEY_CODE),
            },
            BackendError::CommandFailed { message, code } => {
                GatewayError::Backend { message, code }
            }
            BackendError::Unauthorized(_) => GatewayError::AuthenticationFailed,
            other => GatewayError::Backend {
                message: other.to_string(),
                code: None,
            },
        }
    }
}

impl From<CursorError> for GatewayError {
    fn from(err: CursorError) -> Self {
        match err {
            CursorError::NotFound(id) => GatewayError::CursorNotFound(id),
            CursorError::Stream(e) => e.into(),
        }
    }
}

impl GatewayError {
    /// Converts a registry failure for connection `name`.
    pub fn from_connect(err: ConnectError, name: &str) -> Self {
        match err {
            ConnectError::MissingAddress(name) => GatewayError::NoConnection { name },
            ConnectError::Unreachable { address, .. } => GatewayError::ConnectFailed {
                server: address.to_string(),
                name: name.to_string(),
            },
        }
    }
}
