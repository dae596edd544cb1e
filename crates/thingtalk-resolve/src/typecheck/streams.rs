//! Stream-side checks.

use super::checker::Checker;
use super::mismatch;
use super::scope::Scope;
use super::tables::{check_join_params, join_bound, joined_scope};
use super::values::{check_filter, check_value};
use crate::error::CompileResult;
use std::sync::Arc;
use thingtalk_ast::{
    join_schema, DeclarationKind, FunctionDef, FunctionType, NodePath, Stream, Type, Value,
};

impl Checker<'_> {
    /// Check a stream expression and return the signature of its events.
    pub(super) fn check_stream(
        &self,
        stream: &mut Stream,
        scope: &Scope,
        path: &NodePath,
    ) -> CompileResult<Arc<FunctionDef>> {
        match stream {
            Stream::Invocation(inv) => self.check_invocation(inv, FunctionType::Trigger, scope, &[], path),
            Stream::VarRef {
                name,
                in_params,
                schema,
            } => {
                let signature = self.declared(name, &[DeclarationKind::Stream], path)?;
                self.check_params(in_params, &signature, scope, &[], path)?;
                *schema = Some(signature.clone());
                Ok(signature)
            }
            Stream::Monitor { table } => {
                let inner = self.check_table(table, scope, &[], &path.field("table"))?;
                if !inner.is_monitorable {
                    return Err(mismatch(
                        path,
                        format!("{} cannot be monitored", super::display_name(&inner)),
                    ));
                }
                Ok(inner)
            }
            Stream::AtTimer {
                time,
                expiration_date,
            } => {
                let attimer = self.builtin("attimer", path)?;
                normalize_times(time, scope);
                if let Some(arg) = attimer.arg("time") {
                    check_value(time, &arg.ty, scope, &path.field("time"))?;
                }
                if let (Some(date), Some(arg)) = (expiration_date, attimer.arg("expiration_date")) {
                    check_value(date, &arg.ty, scope, &path.field("expiration_date"))?;
                }
                Ok(timer_schema())
            }
            Stream::Timer { base, interval } => {
                let timer = self.builtin("timer", path)?;
                if let Some(arg) = timer.arg("base") {
                    check_value(base, &arg.ty, scope, &path.field("base"))?;
                }
                if let Some(arg) = timer.arg("interval") {
                    check_value(interval, &arg.ty, scope, &path.field("interval"))?;
                }
                Ok(timer_schema())
            }
            Stream::EdgeNew { stream } => self.check_stream(stream, scope, &path.field("stream")),
            Stream::EdgeFilter { stream, filter } | Stream::Filter { stream, filter } => {
                let inner = self.check_stream(stream, scope, &path.field("stream"))?;
                check_filter(filter, &inner, scope, &path.field("filter"))?;
                Ok(inner)
            }
            Stream::Join { stream, table, on } => {
                let left = self.check_stream(stream, scope, &path.field("stream"))?;
                let right_scope = joined_scope(scope, &left);
                let right_bound = join_bound(&[], on);
                let right = self.check_table(table, scope, &right_bound, &path.field("table"))?;
                check_join_params(on, &right, &right_scope, path, &path.field("stream"))?;
                Ok(Arc::new(join_schema(&left, &right, on)))
            }
        }
    }
}

/// `attimer` takes a list of times; a single time becomes a one-element list.
fn normalize_times(time: &mut Value, scope: &Scope) {
    let is_list = match time {
        Value::Array(_) => true,
        Value::VarRef(name) => scope.get(name).is_some_and(|ty| ty.is_array() || *ty == Type::Any),
        _ => false,
    };
    if !is_list {
        *time = Value::Array(vec![std::mem::replace(time, Value::Null)]);
    }
}

fn timer_schema() -> Arc<FunctionDef> {
    Arc::new(FunctionDef::derived(Vec::new(), false, false))
}
