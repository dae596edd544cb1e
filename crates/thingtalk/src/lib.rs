// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! # ThingTalk
//!
//! Front end of the ThingTalk rule language.
//!
//! This crate is a facade that re-exports functionality from:
//! - `thingtalk-ast` - program tree, values, types and channel schemas
//! - `thingtalk-lexer` - tokenization
//! - `thingtalk-parser` - parsing and canonical printing
//! - `thingtalk-resolve` - schema resolution and type checking
//!
//! and adds the consumers of a typed program:
//! - [`slots`] - deterministic views of the fillable leaves of a program
//! - [`compile`] - lowering of rules into executable plans
//!
//! ## Architecture
//!
//! ```text
//! thingtalk-ast
//!     ↓
//! thingtalk-lexer
//!     ↓
//! thingtalk-parser   text ⇄ Program
//!     ↓
//! thingtalk-resolve  Program + SchemaRetriever → typed Program
//!     ↓
//! thingtalk          slots, rule plans, parse_and_typecheck
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use thingtalk::{parse_and_typecheck, MemorySchemaDelegate, SchemaRetriever};
//!
//! let delegate = MemorySchemaDelegate::from_json(&schemas_json)?;
//! let schemas = SchemaRetriever::new(Arc::new(delegate));
//! let program = parse_and_typecheck("now => @com.xkcd.get_comic() => notify;", &schemas, true).await?;
//! for item in thingtalk::slots::iterate_slots2(&program) {
//!     println!("{}", item);
//! }
//! ```

// Re-export AST and foundation types
pub use thingtalk_ast::{self as ast, *};

// Re-export lexer
pub use thingtalk_lexer as lexer;

// Re-export parser
pub use thingtalk_parser as parser;
pub use thingtalk_parser::{generate, parse, ParseError, ParseErrorKind};

// Re-export resolve
pub use thingtalk_resolve as resolve;
pub use thingtalk_resolve::{
    typecheck_program, CheckerOptions, CompileError, CompileResult, DelegateError,
    DiagnosticFormatter, ErrorKind, MemorySchemaDelegate, SchemaDelegate, SchemaError,
    SchemaRetriever,
};

pub mod api;
pub mod compile;
pub mod slots;

pub use api::{format_errors, parse_and_typecheck, parse_source};
pub use compile::{compile_program, RuleMode, RulePlan, Stage, StageInput, StageKind, StageRole};
pub use slots::{
    iterate_primitives, iterate_slots, iterate_slots2, LegacySlot, LegacyValue, Primitive,
    PrimitiveRole, PromptCatalog, PromptError, Slot, SlotItem, SlotKind,
};

// Version info
/// Front end version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
