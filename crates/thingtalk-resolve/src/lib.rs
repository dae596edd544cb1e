// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Schema resolution and type checking for ThingTalk
//!
//! This crate resolves the device schemas a parsed program refers to,
//! checks the program against them and annotates every leaf invocation
//! with its signature.

pub mod error;
pub mod schema;
pub mod typecheck;

pub use error::{CompileError, CompileResult, DiagnosticFormatter, ErrorKind};
pub use schema::{
    DelegateError, MemorySchemaDelegate, SchemaDelegate, SchemaError, SchemaRetriever,
};
pub use typecheck::{typecheck_program, CheckerOptions};
