//! Device schema resolution.
//!
//! - `delegate`: the injected source of class definitions
//! - `memory`: a delegate over Thingpedia-style JSON
//! - `retriever`: the shared, coalescing per-kind cache
//! - `builtin`: functions answered locally (`notify`, `return`, timers)

mod builtin;
mod delegate;
mod memory;
mod retriever;

pub use builtin::{builtin_class, BUILTIN_KIND};
pub use delegate::{DelegateError, SchemaDelegate};
pub use memory::MemorySchemaDelegate;
pub use retriever::SchemaRetriever;

use thingtalk_ast::FunctionType;
use thiserror::Error;

/// Failure to resolve a schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("unknown device kind '{0}'")]
    UnknownSchema(String),

    #[error("{kind} has no {function_type} named '{channel}'")]
    UnknownChannel {
        kind: String,
        channel: String,
        function_type: FunctionType,
    },

    #[error("failed to retrieve the schema of {kind}: {message}")]
    Transport { kind: String, message: String },
}
