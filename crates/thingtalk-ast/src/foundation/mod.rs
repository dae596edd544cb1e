//! Foundation types shared across the AST: source spans, the type system,
//! measurement units, channel schemas and node paths.

pub mod path;
pub mod schema;
pub mod span;
pub mod types;
pub mod units;

pub use path::{NodePath, PathStep};
pub use schema::{ArgDirection, ArgumentDef, ClassDef, FunctionDef, FunctionType};
pub use span::{SourceFile, SourceMap, Span};
pub use types::{Type, TypeMismatch, TypeParseError};
pub use units::UnitFamily;
