//! Type checking.
//!
//! [`typecheck_program`] resolves every device kind a program names, then
//! checks the program against those schemas:
//!
//! - invocation parameters exist, have the declared types and are complete
//! - filters use operators that apply to the field types
//! - joins bind right-hand parameters to compatible left-hand values
//! - aggregates, sorts, indices, slices and projections refer to fields of
//!   the right type
//! - variables and `$event` are only used once something defines them
//!
//! On success every leaf invocation carries its signature in `schema`, its
//! `in_params` are in schema order and its `out_params` list the outputs.
//! The check runs on a copy; the caller's program is only replaced when the
//! whole check succeeds.
//!
//! # Errors
//!
//! The first error aborts the check. Each error carries the [`NodePath`] of
//! the offending node.

mod checker;
mod kinds;
mod scope;
mod streams;
mod tables;
mod values;

#[cfg(test)]
mod tests;

use crate::error::{CompileError, CompileResult, ErrorKind};
use crate::schema::SchemaRetriever;
use checker::Checker;
use futures::future::try_join_all;
use std::collections::HashMap;
use thingtalk_ast::{FunctionDef, NodePath, Program};
use tracing::{debug, info};

/// Options of a type check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckerOptions {
    /// Insert `$?` for missing required parameters instead of failing.
    pub allow_undefined: bool,
}

/// Type-check `program`, annotating it in place on success.
///
/// # Parameters
///
/// * `program` - Parsed program; left untouched on failure
/// * `schemas` - Resolver for the device kinds the program names
/// * `options` - Checker options
///
/// # Errors
///
/// Resolver failures (`UnknownSchema`, `UnknownChannel`, `SchemaTransport`)
/// and type errors (`TypeMismatch`, `MissingRequiredArgument`,
/// `UndefinedName`), located by node path.
pub async fn typecheck_program(
    program: &mut Program,
    schemas: &SchemaRetriever,
    options: &CheckerOptions,
) -> CompileResult<()> {
    let kinds = kinds::collect(program);
    debug!(kinds = kinds.len(), "prefetching schemas");

    let lookups = kinds.iter().map(|(kind, path)| async move {
        schemas
            .get_schema(kind)
            .await
            .map(|class| (kind.clone(), class))
            .map_err(|e| CompileError::from_schema(e, path.clone()))
    });
    let classes: HashMap<_, _> = try_join_all(lookups).await?.into_iter().collect();

    let mut checked = program.clone();
    Checker::new(&classes, schemas.builtins(), options).check_program(&mut checked)?;
    *program = checked;

    info!(
        declarations = program.declarations.len(),
        rules = program.rules.len(),
        permissions = program.permissions.len(),
        "type check complete"
    );
    Ok(())
}

pub(super) fn mismatch(path: &NodePath, message: String) -> CompileError {
    CompileError::new(ErrorKind::TypeMismatch, path.clone(), message)
}

pub(super) fn undefined_name(path: &NodePath, message: String) -> CompileError {
    CompileError::new(ErrorKind::UndefinedName, path.clone(), message)
}

/// `kind.channel` for device functions, the name for declarations.
pub(super) fn display_name(function: &FunctionDef) -> String {
    if function.kind.is_empty() && !function.channel.is_empty() {
        function.channel.clone()
    } else {
        function.qualified_name()
    }
}
