// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! AST types for ThingTalk
//!
//! This crate contains the program tree, the value and type model, channel
//! schemas and node addressing shared by the parser, the type checker, the
//! slot iterator and the compiler.

pub mod ast;
pub mod foundation;

// Re-export commonly used types
pub use foundation::{
    ArgDirection, ArgumentDef, ClassDef, FunctionDef, FunctionType, NodePath, PathStep,
    SourceFile, SourceMap, Span, Type, TypeMismatch, UnitFamily,
};

pub use ast::*;
