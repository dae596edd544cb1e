//! Typing of values, computations and filters.

use super::scope::Scope;
use super::{mismatch, undefined_name};
use crate::error::CompileResult;
use thingtalk_ast::{ComputeFilter, ComputeOp, Filter, FilterAtom, FunctionDef, NodePath, Type, Value};

/// Type of a value, or `None` for a placeholder.
///
/// Fails on names that are not in scope and on `$event` before any stage has
/// produced a result.
pub(super) fn value_type(value: &Value, scope: &Scope, path: &NodePath) -> CompileResult<Option<Type>> {
    match value {
        Value::Undefined(_) => Ok(None),
        Value::VarRef(name) => scope
            .get(name)
            .cloned()
            .map(Some)
            .ok_or_else(|| undefined_name(path, format!("undefined variable '{}'", name))),
        Value::Event(field) => {
            if !scope.has_event() {
                return Err(undefined_name(
                    path,
                    "'$event' used before any stage produced a result".to_string(),
                ));
            }
            Ok(Some(if field.is_some() { Type::String } else { Type::Event }))
        }
        Value::Array(values) => {
            let mut element = Type::Any;
            for (i, v) in values.iter().enumerate() {
                let element_path = path.index(i);
                if let Some(ty) = value_type(v, scope, &element_path)? {
                    element = Type::meet(&element, &ty).map_err(|e| {
                        mismatch(&element_path, format!("array elements have different types: {}", e))
                    })?;
                }
            }
            Ok(Some(element.array_of()))
        }
        Value::Computation { op, operands } => computation_type(*op, operands, scope, path).map(Some),
        Value::ArrayFilter { value, .. } => value_type(value, scope, path),
        other => Ok(other.infer_type(&|_: &str| None)),
    }
}

/// Check that `value` can be used where `expected` is required.
///
/// Placeholders adopt the expected type. Array literals are checked element
/// by element so that the error points at the offending element.
pub(super) fn check_value(value: &Value, expected: &Type, scope: &Scope, path: &NodePath) -> CompileResult<()> {
    match (value, expected) {
        (Value::Undefined(_), _) => Ok(()),
        (Value::Array(values), Type::Array(element)) => {
            for (i, v) in values.iter().enumerate() {
                check_value(v, element, scope, &path.index(i))?;
            }
            Ok(())
        }
        (Value::Array(values), Type::Any) => {
            for (i, v) in values.iter().enumerate() {
                check_value(v, &Type::Any, scope, &path.index(i))?;
            }
            Ok(())
        }
        _ => match value_type(value, scope, path)? {
            Some(actual) if !Type::is_assignable(&actual, expected) => Err(mismatch(
                path,
                format!("expected {}, found {} ({})", expected, actual, value),
            )),
            _ => Ok(()),
        },
    }
}

/// Result type of `count(x)`, `sum(x)`, `distance(a, b)` and friends.
pub(super) fn computation_type(
    op: ComputeOp,
    operands: &[Value],
    scope: &Scope,
    path: &NodePath,
) -> CompileResult<Type> {
    if operands.len() != op.arity() {
        return Err(mismatch(
            path,
            format!(
                "{} takes {} operand(s), found {}",
                op.name(),
                op.arity(),
                operands.len()
            ),
        ));
    }

    let mut types = Vec::with_capacity(operands.len());
    for operand in operands {
        types.push(value_type(operand, scope, path)?.unwrap_or(Type::Any));
    }

    let element = |ty: &Type| -> Option<Type> {
        match ty {
            Type::Any => Some(Type::Any),
            Type::Array(inner) => Some((**inner).clone()),
            _ => None,
        }
    };
    let wrong = |what: &str| {
        mismatch(
            path,
            format!("{} needs {}, found {}", op.name(), what, types[0]),
        )
    };

    match op {
        ComputeOp::Count => element(&types[0]).map(|_| Type::Number).ok_or_else(|| wrong("an array")),
        ComputeOp::Sum | ComputeOp::Avg => match element(&types[0]) {
            Some(Type::Any) => Ok(Type::Number),
            Some(inner) if inner.is_numeric() => Ok(inner),
            _ => Err(wrong("an array of numbers or measures")),
        },
        ComputeOp::Max | ComputeOp::Min => match element(&types[0]) {
            Some(Type::Any) => Ok(Type::Number),
            Some(inner) if inner.is_ordered() => Ok(inner),
            _ => Err(wrong("an array of ordered values")),
        },
        ComputeOp::Distance => {
            for ty in &types {
                if !Type::is_assignable(ty, &Type::Location) {
                    return Err(mismatch(
                        path,
                        format!("distance needs two locations, found {}", ty),
                    ));
                }
            }
            Ok(Type::Measure("m".to_string()))
        }
    }
}

/// Check a filter against the fields of `schema`.
///
/// Atom values are typed in `scope`; computed comparisons may also refer to
/// the fields themselves.
pub(super) fn check_filter(
    filter: &Filter,
    schema: &FunctionDef,
    scope: &Scope,
    path: &NodePath,
) -> CompileResult<()> {
    match filter {
        Filter::True | Filter::False => Ok(()),
        Filter::And(operands) | Filter::Or(operands) => {
            for (i, operand) in operands.iter().enumerate() {
                check_filter(operand, schema, scope, &path.field("operands").index(i))?;
            }
            Ok(())
        }
        Filter::Not(inner) => check_filter(inner, schema, scope, &path.field("operand")),
        Filter::Atom(atom) => check_atom(atom, schema, scope, path),
        Filter::Compute(compute) => check_compute_filter(compute, schema, scope, path),
    }
}

fn check_atom(atom: &FilterAtom, schema: &FunctionDef, scope: &Scope, path: &NodePath) -> CompileResult<()> {
    let field = schema.arg(&atom.name).ok_or_else(|| {
        undefined_name(
            path,
            format!("{} has no field '{}'", super::display_name(schema), atom.name),
        )
    })?;
    let expected = atom.op.value_type(&field.ty).ok_or_else(|| {
        mismatch(
            path,
            format!(
                "operator '{}' cannot be applied to '{}' of type {}",
                atom.op, atom.name, field.ty
            ),
        )
    })?;
    check_value(&atom.value, &expected, scope, &path.field("value"))
}

fn check_compute_filter(
    compute: &ComputeFilter,
    schema: &FunctionDef,
    scope: &Scope,
    path: &NodePath,
) -> CompileResult<()> {
    let names = scope.with_fields(schema);
    let lhs_path = path.field("lhs");
    let lhs = value_type(&compute.lhs, &names, &lhs_path)?.unwrap_or(Type::Number);
    let expected = compute.op.value_type(&lhs).ok_or_else(|| {
        mismatch(
            &lhs_path,
            format!("operator '{}' cannot be applied to a value of type {}", compute.op, lhs),
        )
    })?;
    check_value(&compute.rhs, &expected, &names, &path.field("rhs"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use indexmap::IndexMap;
    use thingtalk_ast::{ArgDirection, ArgumentDef, FilterOp, FunctionType};

    fn scope() -> Scope {
        let mut params = IndexMap::new();
        params.insert("p_author".to_string(), Type::Entity("tt:username".into()));
        params.insert("reviews".to_string(), Type::Entity("tt:review".into()).array_of());
        Scope::with_params(&params)
    }

    fn tweets() -> FunctionDef {
        FunctionDef::new("com.twitter", "search", FunctionType::Query)
            .with_arg(ArgumentDef::new("author", Type::Entity("tt:username".into()), ArgDirection::Out))
            .with_arg(ArgumentDef::new("text", Type::String, ArgDirection::Out))
            .with_arg(ArgumentDef::new("hashtags", Type::Entity("tt:hashtag".into()).array_of(), ArgDirection::Out))
    }

    fn at() -> NodePath {
        NodePath::root().field("rules").index(0)
    }

    #[test]
    fn test_undefined_adopts_expected_type() {
        assert!(check_value(&Value::undefined(), &Type::Date, &scope(), &at()).is_ok());
        assert!(check_value(&Value::Undefined(false), &Type::Number, &scope(), &at()).is_ok());
    }

    #[test]
    fn test_unknown_variable() {
        let err = check_value(&Value::VarRef("title".into()), &Type::String, &scope(), &at()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UndefinedName);
        assert!(err.message.contains("'title'"));
    }

    #[test]
    fn test_event_needs_a_result() {
        let mut s = scope();
        let err = check_value(&Value::Event(None), &Type::String, &s, &at()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UndefinedName);

        s.bind_outputs(&tweets());
        assert!(check_value(&Value::Event(None), &Type::String, &s, &at()).is_ok());
        assert!(check_value(&Value::Event(None), &Type::Number, &s, &at()).is_err());
    }

    #[test]
    fn test_array_error_points_at_element() {
        let value = Value::Array(vec![Value::Time { hour: 8, minute: 0 }, Value::Number(3.0)]);
        let err = check_value(&value, &Type::Time.array_of(), &scope(), &at()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TypeMismatch);
        assert_eq!(err.path, at().index(1));
    }

    #[test]
    fn test_enum_membership() {
        let ty = Type::Enum(vec!["on".into(), "off".into()]);
        assert!(check_value(&Value::Enum("off".into()), &ty, &scope(), &at()).is_ok());
        assert!(check_value(&Value::Enum("dim".into()), &ty, &scope(), &at()).is_err());
    }

    #[test]
    fn test_filter_operators() {
        let schema = tweets();
        let ok = Filter::and(vec![
            Filter::atom("author", FilterOp::Eq, Value::VarRef("p_author".into())),
            Filter::atom("text", FilterOp::Substr, Value::String("rust".into())),
            Filter::atom(
                "hashtags",
                FilterOp::Contains,
                Value::Entity {
                    value: "rust".into(),
                    ty: "tt:hashtag".into(),
                    display: None,
                },
            ),
        ]);
        assert!(check_filter(&ok, &schema, &scope(), &at()).is_ok());

        let bad_op = Filter::atom("hashtags", FilterOp::Gt, Value::undefined());
        assert_eq!(
            check_filter(&bad_op, &schema, &scope(), &at()).unwrap_err().kind,
            ErrorKind::TypeMismatch
        );

        let unknown = Filter::negate(Filter::atom("likes", FilterOp::Eq, Value::Number(1.0)));
        let err = check_filter(&unknown, &schema, &scope(), &at()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UndefinedName);
        assert_eq!(err.path, at().field("operand"));
    }

    #[test]
    fn test_in_array_wraps_value_type() {
        let f = Filter::atom(
            "author",
            FilterOp::InArray,
            Value::Array(vec![Value::undefined(), Value::VarRef("p_author".into())]),
        );
        assert!(check_filter(&f, &tweets(), &scope(), &at()).is_ok());
    }

    #[test]
    fn test_compute_filter() {
        let schema = tweets();
        let count = Value::Computation {
            op: ComputeOp::Count,
            operands: vec![Value::VarRef("hashtags".into())],
        };
        let f = Filter::Compute(ComputeFilter {
            lhs: count.clone(),
            op: FilterOp::Gte,
            rhs: Value::Number(1.0),
        });
        assert!(check_filter(&f, &schema, &scope(), &at()).is_ok());

        let f = Filter::Compute(ComputeFilter {
            lhs: count,
            op: FilterOp::Gte,
            rhs: Value::String("one".into()),
        });
        let err = check_filter(&f, &schema, &scope(), &at()).unwrap_err();
        assert_eq!(err.path, at().field("rhs"));

        let not_array = Value::Computation {
            op: ComputeOp::Count,
            operands: vec![Value::VarRef("text".into())],
        };
        let f = Filter::Compute(ComputeFilter {
            lhs: not_array,
            op: FilterOp::Gte,
            rhs: Value::Number(1.0),
        });
        assert_eq!(
            check_filter(&f, &schema, &scope(), &at()).unwrap_err().kind,
            ErrorKind::TypeMismatch
        );
    }

    #[test]
    fn test_computation_types() {
        let s = scope();
        assert_eq!(
            computation_type(ComputeOp::Count, &[Value::VarRef("reviews".into())], &s, &at()).unwrap(),
            Type::Number
        );
        assert_eq!(
            computation_type(
                ComputeOp::Distance,
                &[Value::undefined(), Value::undefined()],
                &s,
                &at()
            )
            .unwrap(),
            Type::Measure("m".into())
        );
        assert!(computation_type(ComputeOp::Sum, &[Value::VarRef("reviews".into())], &s, &at()).is_err());
        assert!(computation_type(ComputeOp::Distance, &[Value::undefined()], &s, &at()).is_err());
    }
}
