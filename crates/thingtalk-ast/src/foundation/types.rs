//! The ThingTalk type system.
//!
//! `Type` is a closed, recursive sum. Its textual form (`Entity(tt:username)`,
//! `Enum(on,off)`, `Measure(C)`, `Array(Time)`) is used in declarations, in
//! schema files and in diagnostics, and it is also the serialized form.
//!
//! # Examples
//!
//! ```
//! # use thingtalk_ast::foundation::types::Type;
//! let ty: Type = "Array(Entity(tt:contact))".parse().unwrap();
//! assert_eq!(ty.element_type(), Some(&Type::Entity("tt:contact".into())));
//! assert!(Type::is_assignable(&"Measure(F)".parse().unwrap(), &Type::Measure("C".into())));
//! ```

use super::units::unit_family;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A ThingTalk type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Type {
    String,
    Number,
    Boolean,
    Date,
    Time,
    Location,
    /// Unknown or unconstrained; compatible with everything
    Any,
    /// The previous stage's result rendered as a whole
    Event,
    Feed,
    /// Entity with a namespaced subtype, e.g. `tt:username`
    Entity(String),
    /// Enumeration; symbol order is significant for display and options
    Enum(Vec<String>),
    /// Measurement in a specific unit
    Measure(String),
    Array(Box<Type>),
}

/// Failure to unify two types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot unify {left} with {right}")]
pub struct TypeMismatch {
    pub left: Type,
    pub right: Type,
}

/// Failure to parse the textual form of a type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid type '{0}'")]
pub struct TypeParseError(pub String);

impl Type {
    /// Check whether a value of type `from` may be used where `to` is expected.
    pub fn is_assignable(from: &Type, to: &Type) -> bool {
        match (from, to) {
            (Type::Any, _) | (_, Type::Any) => true,
            (Type::Array(a), Type::Array(b)) => Type::is_assignable(a, b),
            (Type::Entity(a), Type::Entity(b)) => a == b,
            (Type::Measure(a), Type::Measure(b)) => {
                a == b || (unit_family(a).is_some() && unit_family(a) == unit_family(b))
            }
            (Type::Enum(a), Type::Enum(b)) => a.iter().all(|sym| b.contains(sym)),
            (Type::Event, Type::String) => true,
            _ => from == to,
        }
    }

    /// Unify two types into the most specific type compatible with both.
    pub fn meet(a: &Type, b: &Type) -> Result<Type, TypeMismatch> {
        let mismatch = || TypeMismatch {
            left: a.clone(),
            right: b.clone(),
        };
        match (a, b) {
            (Type::Any, other) | (other, Type::Any) => Ok(other.clone()),
            (Type::Array(x), Type::Array(y)) => Type::meet(x, y)
                .map(|inner| Type::Array(Box::new(inner)))
                .map_err(|_| mismatch()),
            (Type::Enum(x), Type::Enum(y)) => {
                let same = x.len() == y.len() && x.iter().all(|sym| y.contains(sym));
                if same {
                    Ok(a.clone())
                } else {
                    Err(mismatch())
                }
            }
            (Type::Measure(x), Type::Measure(y)) => match (unit_family(x), unit_family(y)) {
                (Some(fx), Some(fy)) if fx == fy => Ok(Type::Measure(fx.base_unit().to_string())),
                _ if x == y => Ok(a.clone()),
                _ => Err(mismatch()),
            },
            _ if a == b => Ok(a.clone()),
            _ => Err(mismatch()),
        }
    }

    /// Types that support `<`, `>`, sorting and min/max.
    pub fn is_ordered(&self) -> bool {
        matches!(
            self,
            Type::Number | Type::Measure(_) | Type::Date | Type::Time | Type::String | Type::Any
        )
    }

    /// Types that support the substring and prefix/suffix operators.
    pub fn is_string_like(&self) -> bool {
        matches!(self, Type::String | Type::Entity(_) | Type::Any)
    }

    /// Types that can be summed and averaged.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Number | Type::Measure(_) | Type::Any)
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Type::Array(_))
    }

    /// Element type of an array type.
    pub fn element_type(&self) -> Option<&Type> {
        match self {
            Type::Array(inner) => Some(inner),
            _ => None,
        }
    }

    /// Wrap into `Array(self)`.
    pub fn array_of(self) -> Type {
        Type::Array(Box::new(self))
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::String => f.write_str("String"),
            Type::Number => f.write_str("Number"),
            Type::Boolean => f.write_str("Boolean"),
            Type::Date => f.write_str("Date"),
            Type::Time => f.write_str("Time"),
            Type::Location => f.write_str("Location"),
            Type::Any => f.write_str("Any"),
            Type::Event => f.write_str("Event"),
            Type::Feed => f.write_str("Feed"),
            Type::Entity(subtype) => write!(f, "Entity({})", subtype),
            Type::Enum(symbols) => write!(f, "Enum({})", symbols.join(",")),
            Type::Measure(unit) => write!(f, "Measure({})", unit),
            Type::Array(inner) => write!(f, "Array({})", inner),
        }
    }
}

impl FromStr for Type {
    type Err = TypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || TypeParseError(s.to_string());

        if let Some((head, inner)) = split_parametric(s) {
            let inner = inner.trim();
            return match head {
                "Entity" if !inner.is_empty() => Ok(Type::Entity(inner.to_string())),
                "Measure" if !inner.is_empty() => Ok(Type::Measure(inner.to_string())),
                "Enum" => Ok(Type::Enum(
                    inner
                        .split(',')
                        .map(|sym| sym.trim().to_string())
                        .filter(|sym| !sym.is_empty())
                        .collect(),
                )),
                "Array" => Ok(Type::Array(Box::new(inner.parse()?))),
                _ => Err(invalid()),
            };
        }

        match s {
            "String" => Ok(Type::String),
            "Number" => Ok(Type::Number),
            "Boolean" => Ok(Type::Boolean),
            "Date" => Ok(Type::Date),
            "Time" => Ok(Type::Time),
            "Location" => Ok(Type::Location),
            "Any" => Ok(Type::Any),
            "Event" => Ok(Type::Event),
            "Feed" => Ok(Type::Feed),
            _ => Err(invalid()),
        }
    }
}

/// Split `Head(inner)` into its head and inner text.
fn split_parametric(s: &str) -> Option<(&str, &str)> {
    let open = s.find('(')?;
    let inner = s.strip_suffix(')')?.get(open + 1..)?;
    Some((&s[..open], inner))
}

impl TryFrom<String> for Type {
    type Error = TypeParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Type> for String {
    fn from(ty: Type) -> Self {
        ty.to_string()
    }
}
