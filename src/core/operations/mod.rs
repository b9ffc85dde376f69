// src/core/operations/mod.rs

//! Defines every operation the gateway serves and the closed `Operation` enum that
//! dispatches to them.
//!
//! Each operation is a struct that is first parsed from a `RoutedCall`
//! (`ParseOperation`), which is where all argument validation happens, and then
//! executed against the backend (`ExecutableOperation`). The `define_operations!`
//! macro generates the enum, its path names and the dispatch match.

use crate::core::GatewayError;
use crate::core::handler::dispatcher::RoutedCall;
use crate::core::handler::reply::Reply;
use crate::core::state::GatewayState;
use async_trait::async_trait;
use std::sync::Arc;

pub mod authenticate;
pub mod batch;
pub mod cmd;
pub mod connect;
pub mod find;
pub mod helpers;
pub mod hello;
pub mod insert;
pub mod more;
pub mod remove;
pub mod status;
pub mod update;

/// Everything an operation may touch while it runs.
pub struct OperationContext<'a> {
    pub state: &'a Arc<GatewayState>,
    pub call: &'a RoutedCall,
}

/// Builds an operation from a routed call, validating its arguments.
/// Parsing never touches the backend.
pub trait ParseOperation: Sized {
    fn parse(ctx: &OperationContext<'_>) -> Result<Self, GatewayError>;
}

/// Runs a parsed operation.
#[async_trait]
pub trait ExecutableOperation: Send + Sync {
    async fn execute(&self, ctx: &OperationContext<'_>) -> Result<Reply, GatewayError>;
}

async fn run<T>(ctx: &OperationContext<'_>) -> Result<Reply, GatewayError>
where
    T: ParseOperation + ExecutableOperation,
{
    let operation = T::parse(ctx)?;
    operation.execute(ctx).await
}

macro_rules! define_operations {
    ($(($variant:ident, $module:ident, $name:literal)),+ $(,)?) => {
        /// The closed set of operations, named by their path segment.
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            strum_macros::Display,
            strum_macros::EnumString,
            strum_macros::IntoStaticStr,
            strum_macros::EnumIter,
        )]
        pub enum Operation {
            $(
                #[strum(serialize = $name)]
                $variant,
            )+
        }

        impl Operation {
            /// The path segment naming this operation, e.g. `_find`.
            pub fn name(self) -> &'static str {
                self.into()
            }

            /// Parses and executes the operation for `ctx.call`.
            pub async fn execute(self, ctx: &OperationContext<'_>) -> Result<Reply, GatewayError> {
                match self {
                    $( Operation::$variant => run::<$module::$variant>(ctx).await, )+
                }
            }
        }
    };
}

define_operations! {
    (Hello, hello, "_hello"),
    (Status, status, "_status"),
    (Connect, connect, "_connect"),
    (Authenticate, authenticate, "_authenticate"),
    (Cmd, cmd, "_cmd"),
    (Find, find, "_find"),
    (More, more, "_more"),
    (Insert, insert, "_insert"),
    (Update, update, "_update"),
    (Remove, remove, "_remove"),
    (Batch, batch, "_batch"),
}
