//! Values carried by the AST: constants, references and placeholders.

use super::filter::Filter;
use crate::foundation::Type;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A ThingTalk value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Reference to a parameter or an earlier stage's output
    VarRef(String),
    /// Placeholder; the flag tells whether it can be filled locally (`$?`)
    /// or only by a remote party (`$undefined.remote`)
    Undefined(bool),
    Null,
    Boolean(bool),
    String(String),
    Number(f64),
    Measure(f64, String),
    Date(DateValue),
    Time { hour: u32, minute: u32 },
    Location(LocationValue),
    Entity {
        value: String,
        ty: String,
        display: Option<String>,
    },
    Enum(String),
    Array(Vec<Value>),
    /// The previous stage's result, whole or one field of it
    Event(Option<String>),
    /// Scalar computation over fields, used by computed filters
    Computation { op: ComputeOp, operands: Vec<Value> },
    /// Array-valued field restricted by a filter on its elements
    ArrayFilter { value: Box<Value>, filter: Box<Filter> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DateValue {
    Now,
    Absolute { year: i32, month: u32, day: u32 },
    Edge { edge: DateEdge, unit: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateEdge {
    StartOf,
    EndOf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LocationValue {
    Absolute {
        lat: f64,
        lon: f64,
        display: Option<String>,
    },
    /// Named location resolved from the user context (`home`, `work`)
    Relative(String),
}

/// Operator of a `Computation` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComputeOp {
    Count,
    Sum,
    Avg,
    Max,
    Min,
    Distance,
}

impl ComputeOp {
    pub fn name(self) -> &'static str {
        match self {
            ComputeOp::Count => "count",
            ComputeOp::Sum => "sum",
            ComputeOp::Avg => "avg",
            ComputeOp::Max => "max",
            ComputeOp::Min => "min",
            ComputeOp::Distance => "distance",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "count" => Some(ComputeOp::Count),
            "sum" => Some(ComputeOp::Sum),
            "avg" => Some(ComputeOp::Avg),
            "max" => Some(ComputeOp::Max),
            "min" => Some(ComputeOp::Min),
            "distance" => Some(ComputeOp::Distance),
            _ => None,
        }
    }

    /// Number of operands the operator takes.
    pub fn arity(self) -> usize {
        match self {
            ComputeOp::Distance => 2,
            _ => 1,
        }
    }
}

impl DateEdge {
    pub fn name(self) -> &'static str {
        match self {
            DateEdge::StartOf => "start_of",
            DateEdge::EndOf => "end_of",
        }
    }
}

impl Value {
    /// A placeholder that can be filled locally.
    pub fn undefined() -> Self {
        Value::Undefined(true)
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined(_))
    }

    /// Check for a `$undefined.remote` placeholder anywhere inside this value.
    pub fn has_remote_undefined(&self) -> bool {
        self.any(&|v| matches!(v, Value::Undefined(false)))
    }

    /// Check for any placeholder anywhere inside this value.
    pub fn has_undefined(&self) -> bool {
        self.any(&|v| v.is_undefined())
    }

    fn any(&self, pred: &dyn Fn(&Value) -> bool) -> bool {
        if pred(self) {
            return true;
        }
        match self {
            Value::Array(values) | Value::Computation { operands: values, .. } => {
                values.iter().any(|v| v.any(pred))
            }
            Value::ArrayFilter { value, .. } => value.any(pred),
            _ => false,
        }
    }

    /// Infer the type of this value, looking names up with `lookup`.
    ///
    /// Returns `None` for placeholders and for names `lookup` does not know.
    pub fn infer_type<F>(&self, lookup: &F) -> Option<Type>
    where
        F: Fn(&str) -> Option<Type>,
    {
        match self {
            Value::VarRef(name) => lookup(name),
            Value::Undefined(_) => None,
            Value::Null => Some(Type::Any),
            Value::Boolean(_) => Some(Type::Boolean),
            Value::String(_) => Some(Type::String),
            Value::Number(_) => Some(Type::Number),
            Value::Measure(_, unit) => Some(Type::Measure(unit.clone())),
            Value::Date(_) => Some(Type::Date),
            Value::Time { .. } => Some(Type::Time),
            Value::Location(_) => Some(Type::Location),
            Value::Entity { ty, .. } => Some(Type::Entity(ty.clone())),
            Value::Enum(symbol) => Some(Type::Enum(vec![symbol.clone()])),
            Value::Event(None) => Some(Type::Event),
            Value::Event(Some(_)) => Some(Type::String),
            Value::Array(values) => {
                let mut element = Type::Any;
                for v in values {
                    if let Some(ty) = v.infer_type(lookup) {
                        element = Type::meet(&element, &ty).ok()?;
                    }
                }
                Some(element.array_of())
            }
            Value::Computation { op, operands } => match op {
                ComputeOp::Count => Some(Type::Number),
                ComputeOp::Distance => Some(Type::Measure("m".to_string())),
                _ => {
                    let operand = operands.first()?.infer_type(lookup)?;
                    match operand {
                        Type::Array(inner) => Some(*inner),
                        other => Some(other),
                    }
                }
            },
            Value::ArrayFilter { value, .. } => value.infer_type(lookup),
        }
    }
}

fn opt(s: &Option<String>) -> &str {
    s.as_deref().unwrap_or("")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::VarRef(name) => write!(f, "VarRef({})", name),
            Value::Undefined(local) => write!(f, "Undefined({})", local),
            Value::Null => f.write_str("Null"),
            Value::Boolean(b) => write!(f, "Boolean({})", b),
            Value::String(s) => write!(f, "String({})", s),
            Value::Number(n) => write!(f, "Number({})", n),
            Value::Measure(n, unit) => write!(f, "Measure({}, {})", n, unit),
            Value::Date(date) => write!(f, "Date({})", date),
            Value::Time { hour, minute } => write!(f, "Time({}, {})", hour, minute),
            Value::Location(LocationValue::Absolute { lat, lon, display }) => {
                write!(f, "Location({}, {}, {})", lat, lon, opt(display))
            }
            Value::Location(LocationValue::Relative(tag)) => write!(f, "Location({})", tag),
            Value::Entity { value, ty, display } => {
                write!(f, "Entity({}, {}, {})", value, ty, opt(display))
            }
            Value::Enum(symbol) => write!(f, "Enum({})", symbol),
            Value::Array(values) => {
                f.write_str("Array(")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", v)?;
                }
                f.write_str(")")
            }
            Value::Event(field) => write!(f, "Event({})", opt(field)),
            Value::Computation { op, operands } => {
                write!(f, "Computation({}", op.name())?;
                for operand in operands {
                    write!(f, ", {}", operand)?;
                }
                f.write_str(")")
            }
            Value::ArrayFilter { value, filter } => write!(f, "ArrayFilter({}, {})", value, filter),
        }
    }
}

impl fmt::Display for DateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateValue::Now => f.write_str("now"),
            DateValue::Absolute { year, month, day } => write!(f, "{}-{}-{}", year, month, day),
            DateValue::Edge { edge, unit } => write!(f, "{}, {}", edge.name(), unit),
        }
    }
}
