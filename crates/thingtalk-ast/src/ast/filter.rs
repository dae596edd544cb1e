//! Boolean filters over the fields of a table or stream.

use super::value::Value;
use crate::foundation::Type;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Comparison operator of a filter atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    /// `=~`: field contains the value
    Substr,
    /// `~=`: value contains the field
    RevSubstr,
    Contains,
    InArray,
    StartsWith,
    EndsWith,
    PrefixOf,
    SuffixOf,
}

/// `name op value`, comparing a field to a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterAtom {
    pub name: String,
    pub op: FilterOp,
    pub value: Value,
}

/// `lhs op rhs`, comparing a computed value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputeFilter {
    pub lhs: Value,
    pub op: FilterOp,
    pub rhs: Value,
}

/// Filter expression.
///
/// Build compound filters with [`Filter::and`] and [`Filter::or`], which keep
/// the tree flat: an `And` never directly contains another `And`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Filter {
    True,
    False,
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    Atom(FilterAtom),
    Compute(ComputeFilter),
}

const INFIX_OPS: &[(FilterOp, &str)] = &[
    (FilterOp::Eq, "=="),
    (FilterOp::Neq, "!="),
    (FilterOp::Gt, ">"),
    (FilterOp::Gte, ">="),
    (FilterOp::Lt, "<"),
    (FilterOp::Lte, "<="),
    (FilterOp::Substr, "=~"),
    (FilterOp::RevSubstr, "~="),
];

const FUNCTION_OPS: &[(FilterOp, &str)] = &[
    (FilterOp::Contains, "contains"),
    (FilterOp::InArray, "in_array"),
    (FilterOp::StartsWith, "starts_with"),
    (FilterOp::EndsWith, "ends_with"),
    (FilterOp::PrefixOf, "prefix_of"),
    (FilterOp::SuffixOf, "suffix_of"),
];

impl FilterOp {
    pub fn as_str(self) -> &'static str {
        INFIX_OPS
            .iter()
            .chain(FUNCTION_OPS)
            .find(|(op, _)| *op == self)
            .map(|(_, s)| *s)
            .unwrap_or("?")
    }

    /// Operators written `name op value`.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        INFIX_OPS.iter().find(|(_, s)| *s == symbol).map(|(op, _)| *op)
    }

    /// Operators written `op(name, value)`.
    pub fn from_function_name(name: &str) -> Option<Self> {
        FUNCTION_OPS.iter().find(|(_, s)| *s == name).map(|(op, _)| *op)
    }

    pub fn is_infix(self) -> bool {
        INFIX_OPS.iter().any(|(op, _)| *op == self)
    }

    /// Type the compared value must have, given the field's type.
    ///
    /// Returns `None` when the operator does not apply to the field type.
    pub fn value_type(self, field: &Type) -> Option<Type> {
        match self {
            FilterOp::Eq | FilterOp::Neq => Some(field.clone()),
            FilterOp::Gt | FilterOp::Gte | FilterOp::Lt | FilterOp::Lte => {
                field.is_ordered().then(|| field.clone())
            }
            FilterOp::Substr
            | FilterOp::RevSubstr
            | FilterOp::StartsWith
            | FilterOp::EndsWith
            | FilterOp::PrefixOf
            | FilterOp::SuffixOf => match field {
                Type::Any => Some(Type::Any),
                t if t.is_string_like() => Some(Type::String),
                _ => None,
            },
            FilterOp::Contains => match field {
                Type::Any => Some(Type::Any),
                Type::Array(inner) => Some((**inner).clone()),
                _ => None,
            },
            FilterOp::InArray => Some(field.clone().array_of()),
        }
    }
}

impl Filter {
    pub fn atom(name: &str, op: FilterOp, value: Value) -> Self {
        Filter::Atom(FilterAtom {
            name: name.to_string(),
            op,
            value,
        })
    }

    /// Conjunction, flattening nested `And`s and dropping `True`.
    pub fn and(operands: Vec<Filter>) -> Self {
        let mut flat = Vec::new();
        for operand in operands {
            match operand {
                Filter::True => {}
                Filter::And(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Filter::True,
            1 => flat.remove(0),
            _ => Filter::And(flat),
        }
    }

    /// Disjunction, flattening nested `Or`s and dropping `False`.
    pub fn or(operands: Vec<Filter>) -> Self {
        let mut flat = Vec::new();
        for operand in operands {
            match operand {
                Filter::False => {}
                Filter::Or(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Filter::False,
            1 => flat.remove(0),
            _ => Filter::Or(flat),
        }
    }

    pub fn negate(filter: Filter) -> Self {
        Filter::Not(Box::new(filter))
    }

    pub fn is_true(&self) -> bool {
        matches!(self, Filter::True)
    }

    /// All atoms in textual order.
    pub fn atoms(&self) -> Vec<&FilterAtom> {
        let mut out = Vec::new();
        self.collect_atoms(&mut out);
        out
    }

    fn collect_atoms<'a>(&'a self, out: &mut Vec<&'a FilterAtom>) {
        match self {
            Filter::And(ops) | Filter::Or(ops) => ops.iter().for_each(|op| op.collect_atoms(out)),
            Filter::Not(inner) => inner.collect_atoms(out),
            Filter::Atom(atom) => out.push(atom),
            Filter::True | Filter::False | Filter::Compute(_) => {}
        }
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for FilterAtom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Atom({}, {}, {})", self.name, self.op, self.value)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let list = |f: &mut fmt::Formatter<'_>, name: &str, ops: &[Filter]| {
            write!(f, "{}(", name)?;
            for (i, op) in ops.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}", op)?;
            }
            f.write_str(")")
        };
        match self {
            Filter::True => f.write_str("True"),
            Filter::False => f.write_str("False"),
            Filter::And(ops) => list(f, "And", ops),
            Filter::Or(ops) => list(f, "Or", ops),
            Filter::Not(inner) => write!(f, "Not({})", inner),
            Filter::Atom(atom) => write!(f, "{}", atom),
            Filter::Compute(c) => write!(f, "Compute({}, {}, {})", c.lhs, c.op, c.rhs),
        }
    }
}
