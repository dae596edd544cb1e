//! Hand-written recursive descent parser and canonical printer for ThingTalk
//!
//! `parse` turns program text into a [`thingtalk_ast::Program`]; `generate`
//! prints a program back in canonical form, such that parsing the output
//! yields the same tree.

pub mod generate;
pub mod parser;

pub use generate::generate;
pub use parser::{parse, parse_with_file_id, ParseError, ParseErrorKind};

// Re-export lexer
pub use thingtalk_lexer::Token;
