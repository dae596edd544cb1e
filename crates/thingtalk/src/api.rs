//! One-call entry points over the parser and the type checker.

use crate::resolve::{
    typecheck_program, CheckerOptions, CompileError, CompileResult, DiagnosticFormatter,
    SchemaRetriever,
};
use thingtalk_ast::{Program, SourceMap};
use thingtalk_parser::parse_with_file_id;
use tracing::debug;

/// Parse `code` and type-check it against `schemas`.
///
/// With `allow_undefined`, missing required parameters are filled with `$?`
/// instead of failing the check.
///
/// # Errors
///
/// Syntax errors (with their span) and every error of
/// [`typecheck_program`], unchanged.
pub async fn parse_and_typecheck(
    code: &str,
    schemas: &SchemaRetriever,
    allow_undefined: bool,
) -> CompileResult<Program> {
    let mut program = thingtalk_parser::parse(code)?;
    typecheck_program(&mut program, schemas, &CheckerOptions { allow_undefined }).await?;
    Ok(program)
}

/// Register `code` under `name` in `sources` and parse it.
///
/// Syntax errors carry a span into `sources`, so they can be rendered with
/// [`format_errors`].
pub fn parse_source(name: &str, code: &str, sources: &mut SourceMap) -> CompileResult<Program> {
    let file_id = sources.add_file(name, code.to_string());
    debug!(file = name, file_id, bytes = code.len(), "parsing");
    parse_with_file_id(code, file_id).map_err(CompileError::from)
}

/// Render diagnostics with source context.
pub fn format_errors(errors: &[CompileError], sources: &SourceMap) -> String {
    DiagnosticFormatter::new(sources).format_all(errors)
}
