//! Tables: the query side of a rule.
//!
//! A table produces rows. Leaves are invocations, calls to declared queries
//! and references to earlier results; the other variants transform their
//! operand. The signature of a composite table is derived on demand by
//! [`Table::schema`] from the annotations on its leaves, so the type checker
//! only ever writes leaf annotations.

use super::filter::Filter;
use super::invocation::{display_params, InputParam, Invocation};
use super::value::Value;
use crate::foundation::{ArgDirection, ArgumentDef, FunctionDef, Type};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateOp {
    Count,
    Sum,
    Avg,
    Max,
    Min,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Query-side expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Table {
    Invocation(Invocation),
    /// Call to a declared query
    VarRef {
        name: String,
        in_params: Vec<InputParam>,
        #[serde(skip)]
        schema: Option<Arc<FunctionDef>>,
    },
    /// Earlier result of a device query; `index` counts back from the latest (-1)
    ResultRef {
        kind: String,
        channel: String,
        index: Value,
        #[serde(skip)]
        schema: Option<Arc<FunctionDef>>,
    },
    Filter {
        table: Box<Table>,
        filter: Filter,
    },
    Projection {
        table: Box<Table>,
        fields: Vec<String>,
    },
    /// Join; each `on` param binds a right-hand input to a left-hand value
    Join {
        left: Box<Table>,
        right: Box<Table>,
        on: Vec<InputParam>,
    },
    Aggregate {
        op: AggregateOp,
        field: Option<String>,
        table: Box<Table>,
    },
    Sort {
        field: String,
        direction: SortDirection,
        table: Box<Table>,
    },
    Index {
        table: Box<Table>,
        indices: Vec<Value>,
    },
    Slice {
        table: Box<Table>,
        base: Value,
        limit: Value,
    },
    Compute {
        table: Box<Table>,
        expr: Value,
        alias: Option<String>,
    },
}

/// Output name of a `compute` without an explicit alias.
pub const DEFAULT_COMPUTE_ALIAS: &str = "result";

impl AggregateOp {
    pub fn name(self) -> &'static str {
        match self {
            AggregateOp::Count => "count",
            AggregateOp::Sum => "sum",
            AggregateOp::Avg => "avg",
            AggregateOp::Max => "max",
            AggregateOp::Min => "min",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "count" => Some(AggregateOp::Count),
            "sum" => Some(AggregateOp::Sum),
            "avg" => Some(AggregateOp::Avg),
            "max" => Some(AggregateOp::Max),
            "min" => Some(AggregateOp::Min),
            _ => None,
        }
    }
}

impl SortDirection {
    pub fn name(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

impl Table {
    /// Apply a filter, merging it into a bare invocation or an existing filter.
    pub fn filtered(table: Table, filter: Filter) -> Table {
        match table {
            Table::Invocation(mut inv) => {
                inv.filter = Filter::and(vec![inv.filter, filter]);
                Table::Invocation(inv)
            }
            Table::Filter { table, filter: existing } => Table::Filter {
                table,
                filter: Filter::and(vec![existing, filter]),
            },
            other => Table::Filter {
                table: Box::new(other),
                filter,
            },
        }
    }

    /// Binding strength used when printing: 0 join, 1 prefix forms and
    /// filters, 2 postfix index/slice, 3 atoms.
    pub fn precedence(&self) -> u8 {
        match self {
            Table::Join { .. } => 0,
            Table::Filter { .. }
            | Table::Projection { .. }
            | Table::Aggregate { .. }
            | Table::Sort { .. }
            | Table::Compute { .. } => 1,
            Table::Index { .. } | Table::Slice { .. } => 2,
            Table::Invocation(inv) if !inv.filter.is_true() => 1,
            Table::Invocation(_) | Table::VarRef { .. } | Table::ResultRef { .. } => 3,
        }
    }

    /// Signature of the rows this table produces.
    ///
    /// Returns `None` if a leaf has not been annotated or a referenced field
    /// does not exist.
    pub fn schema(&self) -> Option<Arc<FunctionDef>> {
        match self {
            Table::Invocation(inv) => inv.schema.clone(),
            Table::VarRef { schema, .. } | Table::ResultRef { schema, .. } => schema.clone(),
            Table::Filter { table, .. }
            | Table::Sort { table, .. }
            | Table::Index { table, .. }
            | Table::Slice { table, .. } => table.schema(),
            Table::Projection { table, fields } => {
                projection_schema(&*table.schema()?, fields).map(Arc::new)
            }
            Table::Join { left, right, on } => {
                Some(Arc::new(join_schema(&*left.schema()?, &*right.schema()?, on)))
            }
            Table::Aggregate { op, field, table } => {
                aggregate_schema(&*table.schema()?, *op, field.as_deref()).map(Arc::new)
            }
            Table::Compute { table, expr, alias } => Some(Arc::new(compute_schema(
                &*table.schema()?,
                expr,
                alias.as_deref().unwrap_or(DEFAULT_COMPUTE_ALIAS),
            ))),
        }
    }
}

/// Union of both sides minus the right-hand parameters bound by `on`.
///
/// A name present on both sides is renamed `first.x` / `second.x`.
pub fn join_schema(left: &FunctionDef, right: &FunctionDef, on: &[InputParam]) -> FunctionDef {
    let right_args: Vec<&ArgumentDef> = right
        .args
        .iter()
        .filter(|a| !on.iter().any(|p| p.name == a.name))
        .collect();
    let duplicated = |name: &str| {
        left.args.iter().any(|a| a.name == name) && right_args.iter().any(|a| a.name == name)
    };

    let mut args = Vec::with_capacity(left.args.len() + right_args.len());
    for arg in &left.args {
        let mut arg = arg.clone();
        if duplicated(&arg.name) {
            arg.name = format!("first.{}", arg.name);
        }
        args.push(arg);
    }
    for arg in right_args.iter().copied() {
        let mut arg = arg.clone();
        if duplicated(&arg.name) {
            arg.name = format!("second.{}", arg.name);
        }
        args.push(arg);
    }

    FunctionDef::derived(
        args,
        left.is_list || right.is_list,
        left.is_monitorable && right.is_monitorable,
    )
}

/// Inputs of the operand plus the single aggregated output.
pub fn aggregate_schema(
    inner: &FunctionDef,
    op: AggregateOp,
    field: Option<&str>,
) -> Option<FunctionDef> {
    let output = match (op, field) {
        (AggregateOp::Count, None) => ArgumentDef::new("count", Type::Number, ArgDirection::Out),
        (_, Some(field)) => {
            let source = inner.arg(field)?;
            ArgumentDef::new(field, source.ty.clone(), ArgDirection::Out)
        }
        (_, None) => return None,
    };
    let mut args: Vec<ArgumentDef> = inner.inputs().cloned().collect();
    args.push(output);
    Some(FunctionDef::derived(args, false, inner.is_monitorable))
}

/// Inputs of the operand plus the selected outputs, in selection order.
pub fn projection_schema(inner: &FunctionDef, fields: &[String]) -> Option<FunctionDef> {
    let mut args: Vec<ArgumentDef> = inner.inputs().cloned().collect();
    for field in fields {
        let arg = inner.outputs().find(|a| &a.name == field)?;
        args.push(arg.clone());
    }
    Some(FunctionDef::derived(args, inner.is_list, inner.is_monitorable))
}

/// The operand's signature plus the computed output.
pub fn compute_schema(inner: &FunctionDef, expr: &Value, alias: &str) -> FunctionDef {
    let lookup = |name: &str| inner.arg(name).map(|a| a.ty.clone());
    let ty = expr.infer_type(&lookup).unwrap_or(Type::Any);
    let mut args: Vec<ArgumentDef> = inner
        .args
        .iter()
        .filter(|a| a.name != alias)
        .cloned()
        .collect();
    args.push(ArgumentDef::new(alias, ty, ArgDirection::Out));
    FunctionDef::derived(args, inner.is_list, inner.is_monitorable)
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Table::Invocation(inv) => write!(f, "{}", inv),
            Table::VarRef {
                name, in_params, ..
            } => {
                write!(f, "VarRef({}, ", name)?;
                display_params(f, in_params)?;
                f.write_str(", )")
            }
            Table::ResultRef {
                kind,
                channel,
                index,
                ..
            } => write!(f, "ResultRef({}, {}, {}, )", kind, channel, index),
            Table::Filter { table, filter } => write!(f, "Filter({}, {})", table, filter),
            Table::Projection { table, fields } => {
                write!(f, "Projection({}, {})", table, fields.join(", "))
            }
            Table::Join { left, right, .. } => write!(f, "Join({}, {})", left, right),
            Table::Aggregate { op, field, table } => write!(
                f,
                "Aggregate({}, {}, {})",
                op.name(),
                field.as_deref().unwrap_or(""),
                table
            ),
            Table::Sort {
                field,
                direction,
                table,
            } => write!(f, "Sort({}, {}, {})", field, direction.name(), table),
            Table::Index { table, .. } => write!(f, "Index({})", table),
            Table::Slice { table, base, limit } => {
                write!(f, "Slice({}, {}, {})", table, base, limit)
            }
            Table::Compute { table, expr, .. } => write!(f, "Compute({}, {})", table, expr),
        }
    }
}
