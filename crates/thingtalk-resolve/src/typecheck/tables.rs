//! Query-side checks.

use super::checker::Checker;
use super::scope::Scope;
use super::values::{check_filter, check_value, value_type};
use super::{display_name, mismatch, undefined_name};
use crate::error::{CompileError, CompileResult, ErrorKind};
use std::sync::Arc;
use thingtalk_ast::{
    aggregate_schema, compute_schema, join_schema, projection_schema, AggregateOp, DeclarationKind,
    FunctionDef, FunctionType, InputParam, NodePath, Table, Type, DEFAULT_COMPUTE_ALIAS,
};

impl Checker<'_> {
    /// Check a table expression and return the signature of its rows.
    ///
    /// `bound` lists the input parameters supplied by an enclosing join.
    pub(super) fn check_table(
        &self,
        table: &mut Table,
        scope: &Scope,
        bound: &[String],
        path: &NodePath,
    ) -> CompileResult<Arc<FunctionDef>> {
        match table {
            Table::Invocation(inv) => self.check_invocation(inv, FunctionType::Query, scope, bound, path),
            Table::VarRef {
                name,
                in_params,
                schema,
            } => {
                let signature = self.declared(name, &[DeclarationKind::Query], path)?;
                self.check_params(in_params, &signature, scope, bound, path)?;
                *schema = Some(signature.clone());
                Ok(signature)
            }
            Table::ResultRef {
                kind,
                channel,
                index,
                schema,
            } => {
                let function = self.function(kind, channel, FunctionType::Query, path)?;
                check_value(index, &Type::Number, scope, &path.field("index"))?;
                *schema = Some(function.clone());
                Ok(function)
            }
            Table::Filter { table, filter } => {
                let inner = self.check_table(table, scope, bound, &path.field("table"))?;
                check_filter(filter, &inner, scope, &path.field("filter"))?;
                Ok(inner)
            }
            Table::Projection { table, fields } => {
                let inner = self.check_table(table, scope, bound, &path.field("table"))?;
                if let Some(missing) = fields
                    .iter()
                    .find(|f| !inner.outputs().any(|arg| &arg.name == *f))
                {
                    return Err(undefined_name(
                        path,
                        format!("{} has no output '{}'", display_name(&inner), missing),
                    ));
                }
                derived(projection_schema(&inner, fields), path)
            }
            Table::Join { left, right, on } => {
                let left_schema = self.check_table(left, scope, bound, &path.field("left"))?;
                let right_scope = joined_scope(scope, &left_schema);
                let right_bound = join_bound(bound, on);
                let right_schema =
                    self.check_table(right, scope, &right_bound, &path.field("right"))?;
                check_join_params(on, &right_schema, &right_scope, path, &path.field("left"))?;
                Ok(Arc::new(join_schema(&left_schema, &right_schema, on)))
            }
            Table::Aggregate { op, field, table } => {
                let inner = self.check_table(table, scope, bound, &path.field("table"))?;
                match (*op, field.as_deref()) {
                    (AggregateOp::Count, Some(_)) => {
                        return Err(mismatch(path, "count does not take a field".to_string()));
                    }
                    (AggregateOp::Count, None) => {}
                    (op, None) => {
                        return Err(mismatch(path, format!("{} requires a field", op.name())));
                    }
                    (op, Some(field)) => {
                        let ty = field_type(&inner, field, path)?;
                        if !ty.is_numeric() {
                            return Err(mismatch(
                                path,
                                format!("cannot compute {} of '{}' of type {}", op.name(), field, ty),
                            ));
                        }
                    }
                }
                derived(aggregate_schema(&inner, *op, field.as_deref()), path)
            }
            Table::Sort { field, table, .. } => {
                let inner = self.check_table(table, scope, bound, &path.field("table"))?;
                let ty = field_type(&inner, field, path)?;
                if !ty.is_ordered() {
                    return Err(mismatch(
                        path,
                        format!("cannot sort by '{}' of type {}", field, ty),
                    ));
                }
                Ok(inner)
            }
            Table::Index { table, indices } => {
                let inner = self.check_table(table, scope, bound, &path.field("table"))?;
                let indices_path = path.field("indices");
                for (i, index) in indices.iter().enumerate() {
                    check_value(index, &Type::Number, scope, &indices_path.index(i))?;
                }
                Ok(inner)
            }
            Table::Slice { table, base, limit } => {
                let inner = self.check_table(table, scope, bound, &path.field("table"))?;
                check_value(base, &Type::Number, scope, &path.field("base"))?;
                check_value(limit, &Type::Number, scope, &path.field("limit"))?;
                Ok(inner)
            }
            Table::Compute { table, expr, alias } => {
                let inner = self.check_table(table, scope, bound, &path.field("table"))?;
                value_type(expr, &scope.with_fields(&inner), &path.field("expr"))?;
                let alias = alias.as_deref().unwrap_or(DEFAULT_COMPUTE_ALIAS);
                Ok(Arc::new(compute_schema(&inner, expr, alias)))
            }
        }
    }
}

/// Names visible to the right-hand side of a join.
pub(super) fn joined_scope(scope: &Scope, left: &FunctionDef) -> Scope {
    let mut joined = scope.clone();
    joined.bind_outputs(left);
    joined
}

/// `bound` plus the parameters a join's `on` list supplies.
pub(super) fn join_bound(bound: &[String], on: &[InputParam]) -> Vec<String> {
    bound
        .iter()
        .cloned()
        .chain(on.iter().map(|p| p.name.clone()))
        .collect()
}

/// Each `on` parameter must name an input of the right-hand side and carry a
/// compatible value. `$event` binds as a string.
pub(super) fn check_join_params(
    on: &[InputParam],
    right: &FunctionDef,
    scope: &Scope,
    path: &NodePath,
    left: &NodePath,
) -> CompileResult<()> {
    let on_path = path.field("on");
    for param in on {
        let param_path = on_path.key(&param.name);
        let arg = right
            .arg(&param.name)
            .filter(|arg| arg.is_input())
            .ok_or_else(|| {
                undefined_name(
                    &param_path,
                    format!(
                        "{} has no input parameter '{}'",
                        display_name(right),
                        param.name
                    ),
                )
            })?;
        let Some(actual) = value_type(&param.value, scope, &param_path)? else {
            continue;
        };
        let actual = if actual == Type::Event {
            Type::String
        } else {
            actual
        };
        if !Type::is_assignable(&actual, &arg.ty) {
            Type::meet(&actual, &arg.ty).map_err(|e| {
                mismatch(
                    &param_path,
                    format!("cannot join '{}' on {}: {}", param.name, param.value, e),
                )
                .with_label(left.clone(), "left side of the join".to_string())
            })?;
        }
    }
    Ok(())
}

fn field_type(schema: &FunctionDef, field: &str, path: &NodePath) -> CompileResult<Type> {
    schema
        .arg(field)
        .map(|arg| arg.ty.clone())
        .ok_or_else(|| {
            undefined_name(
                path,
                format!("{} has no field '{}'", display_name(schema), field),
            )
        })
}

fn derived(schema: Option<FunctionDef>, path: &NodePath) -> CompileResult<Arc<FunctionDef>> {
    schema.map(Arc::new).ok_or_else(|| {
        CompileError::new(
            ErrorKind::Internal,
            path.clone(),
            "failed to derive the result signature".to_string(),
        )
    })
}
