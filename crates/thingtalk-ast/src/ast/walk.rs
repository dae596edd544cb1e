//! Resolution of node paths to values.
//!
//! Every fillable value in a program has a [`NodePath`]. The paths follow the
//! field names of the AST (`rules[0].queries[1].right.in_params.status`,
//! `permissions[0].principal.operands[1].value[0]`) with one exception: the
//! fields of an invocation are reached directly from the table, stream or
//! action holding it.

use super::filter::Filter;
use super::invocation::{InputParam, Invocation, Selector};
use super::program::Program;
use super::statement::{Action, DeclarationBody, PermissionFunction, PermissionRule, Rule, RuleTrigger};
use super::stream::Stream;
use super::table::Table;
use super::value::Value;
use crate::foundation::{NodePath, PathStep};

impl Program {
    /// Mutable access to the value at `path`, if the path still resolves.
    pub fn value_at_mut(&mut self, path: &NodePath) -> Option<&mut Value> {
        let (field, rest) = take_field(path.steps())?;
        match field {
            "principal" if rest.is_empty() => self.principal.as_mut(),
            "declarations" => {
                let (i, rest) = take_index(rest)?;
                body_value(&mut self.declarations.get_mut(i)?.body, rest)
            }
            "datasets" => {
                let (i, rest) = take_index(rest)?;
                let (field, rest) = take_field(rest)?;
                if field != "examples" {
                    return None;
                }
                let (j, rest) = take_index(rest)?;
                let example = self.datasets.get_mut(i)?.examples.get_mut(j)?;
                body_value(&mut example.body, rest)
            }
            "rules" => {
                let (i, rest) = take_index(rest)?;
                rule_value(self.rules.get_mut(i)?, rest)
            }
            "permissions" => {
                let (i, rest) = take_index(rest)?;
                permission_value(self.permissions.get_mut(i)?, rest)
            }
            _ => None,
        }
    }
}

fn take_field(steps: &[PathStep]) -> Option<(&str, &[PathStep])> {
    match steps.split_first()? {
        (PathStep::Field(name), rest) => Some((name.as_str(), rest)),
        _ => None,
    }
}

fn take_key(steps: &[PathStep]) -> Option<(&str, &[PathStep])> {
    match steps.split_first()? {
        (PathStep::Key(key), rest) => Some((key.as_str(), rest)),
        _ => None,
    }
}

fn take_index(steps: &[PathStep]) -> Option<(usize, &[PathStep])> {
    match steps.split_first()? {
        (PathStep::Index(i), rest) => Some((*i, rest)),
        _ => None,
    }
}

fn body_value<'p>(body: &'p mut DeclarationBody, steps: &[PathStep]) -> Option<&'p mut Value> {
    let (field, rest) = take_field(steps)?;
    match (body, field) {
        (DeclarationBody::Program(rules), "rules") => {
            let (i, rest) = take_index(rest)?;
            rule_value(rules.get_mut(i)?, rest)
        }
        (DeclarationBody::Query(table), "table") => table_value(table, rest),
        (DeclarationBody::Stream(stream), "stream") => stream_value(stream, rest),
        (DeclarationBody::Action(action), "action") => action_value(action, rest),
        _ => None,
    }
}

fn rule_value<'p>(rule: &'p mut Rule, steps: &[PathStep]) -> Option<&'p mut Value> {
    let (field, rest) = take_field(steps)?;
    match field {
        "stream" => match &mut rule.trigger {
            RuleTrigger::Stream(stream) => stream_value(stream, rest),
            RuleTrigger::Now | RuleTrigger::OnInput => None,
        },
        "queries" => {
            let (i, rest) = take_index(rest)?;
            table_value(rule.queries.get_mut(i)?, rest)
        }
        "actions" => {
            let (i, rest) = take_index(rest)?;
            action_value(rule.actions.get_mut(i)?, rest)
        }
        _ => None,
    }
}

fn permission_value<'p>(rule: &'p mut PermissionRule, steps: &[PathStep]) -> Option<&'p mut Value> {
    let (field, rest) = take_field(steps)?;
    let function = match field {
        "principal" => return filter_value(&mut rule.principal, rest),
        "query" => &mut rule.query,
        "action" => &mut rule.action,
        _ => return None,
    };
    let (field, rest) = take_field(rest)?;
    match (function, field) {
        (PermissionFunction::Specified { filter, .. }, "filter") => filter_value(filter, rest),
        _ => None,
    }
}

fn table_value<'p>(table: &'p mut Table, steps: &[PathStep]) -> Option<&'p mut Value> {
    match table {
        Table::Invocation(inv) => invocation_value(inv, steps),
        other => {
            let (field, rest) = take_field(steps)?;
            match (other, field) {
                (Table::VarRef { in_params, .. }, "in_params") => param_value(in_params, rest),
                (Table::ResultRef { index, .. }, "index") => element_value(index, rest),
                (
                    Table::Filter { table, .. }
                    | Table::Projection { table, .. }
                    | Table::Aggregate { table, .. }
                    | Table::Sort { table, .. }
                    | Table::Index { table, .. }
                    | Table::Slice { table, .. }
                    | Table::Compute { table, .. },
                    "table",
                ) => table_value(table, rest),
                (Table::Filter { filter, .. }, "filter") => filter_value(filter, rest),
                (Table::Join { left, .. }, "left") => table_value(left, rest),
                (Table::Join { right, .. }, "right") => table_value(right, rest),
                (Table::Join { on, .. }, "on") => param_value(on, rest),
                (Table::Index { indices, .. }, "indices") => {
                    let (i, rest) = take_index(rest)?;
                    element_value(indices.get_mut(i)?, rest)
                }
                (Table::Slice { base, .. }, "base") => element_value(base, rest),
                (Table::Slice { limit, .. }, "limit") => element_value(limit, rest),
                (Table::Compute { expr, .. }, "expr") => element_value(expr, rest),
                _ => None,
            }
        }
    }
}

fn stream_value<'p>(stream: &'p mut Stream, steps: &[PathStep]) -> Option<&'p mut Value> {
    match stream {
        Stream::Invocation(inv) => invocation_value(inv, steps),
        other => {
            let (field, rest) = take_field(steps)?;
            match (other, field) {
                (Stream::VarRef { in_params, .. }, "in_params") => param_value(in_params, rest),
                (Stream::Monitor { table }, "table") => table_value(table, rest),
                (Stream::AtTimer { time, .. }, "time") => element_value(time, rest),
                (Stream::AtTimer { expiration_date, .. }, "expiration_date") => {
                    element_value(expiration_date.as_mut()?, rest)
                }
                (Stream::Timer { base, .. }, "base") => element_value(base, rest),
                (Stream::Timer { interval, .. }, "interval") => element_value(interval, rest),
                (
                    Stream::EdgeNew { stream }
                    | Stream::EdgeFilter { stream, .. }
                    | Stream::Filter { stream, .. }
                    | Stream::Join { stream, .. },
                    "stream",
                ) => stream_value(stream, rest),
                (Stream::EdgeFilter { filter, .. } | Stream::Filter { filter, .. }, "filter") => {
                    filter_value(filter, rest)
                }
                (Stream::Join { table, .. }, "table") => table_value(table, rest),
                (Stream::Join { on, .. }, "on") => param_value(on, rest),
                _ => None,
            }
        }
    }
}

fn action_value<'p>(action: &'p mut Action, steps: &[PathStep]) -> Option<&'p mut Value> {
    match action {
        Action::Invocation(inv) => invocation_value(inv, steps),
        Action::VarRef { in_params, .. } => {
            let (field, rest) = take_field(steps)?;
            if field != "in_params" {
                return None;
            }
            param_value(in_params, rest)
        }
    }
}

fn invocation_value<'p>(inv: &'p mut Invocation, steps: &[PathStep]) -> Option<&'p mut Value> {
    let (field, rest) = take_field(steps)?;
    match field {
        "in_params" => param_value(&mut inv.in_params, rest),
        "attributes" => match &mut inv.selector {
            Selector::Device(device) => param_value(&mut device.attributes, rest),
            Selector::Builtin => None,
        },
        "filter" => filter_value(&mut inv.filter, rest),
        _ => None,
    }
}

fn filter_value<'p>(filter: &'p mut Filter, steps: &[PathStep]) -> Option<&'p mut Value> {
    let (field, rest) = take_field(steps)?;
    match (filter, field) {
        (Filter::And(ops) | Filter::Or(ops), "operands") => {
            let (i, rest) = take_index(rest)?;
            filter_value(ops.get_mut(i)?, rest)
        }
        (Filter::Not(inner), "operand") => filter_value(inner, rest),
        (Filter::Atom(atom), "value") => element_value(&mut atom.value, rest),
        (Filter::Compute(compute), "lhs") => element_value(&mut compute.lhs, rest),
        (Filter::Compute(compute), "rhs") => element_value(&mut compute.rhs, rest),
        _ => None,
    }
}

fn param_value<'p>(params: &'p mut [InputParam], steps: &[PathStep]) -> Option<&'p mut Value> {
    let (name, rest) = take_key(steps)?;
    let param = params.iter_mut().find(|p| p.name == name)?;
    element_value(&mut param.value, rest)
}

/// The value itself, or an element of it for trailing index steps.
fn element_value<'p>(value: &'p mut Value, steps: &[PathStep]) -> Option<&'p mut Value> {
    match take_index(steps) {
        None if steps.is_empty() => Some(value),
        None => None,
        Some((i, rest)) => match value {
            Value::Array(elements) => element_value(elements.get_mut(i)?, rest),
            _ => None,
        },
    }
}
