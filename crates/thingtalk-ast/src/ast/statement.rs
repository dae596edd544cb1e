//! Rules, declarations, datasets and permission rules.

use super::filter::Filter;
use super::invocation::{display_params, InputParam, Invocation};
use super::stream::Stream;
use super::table::Table;
use super::value::Value;
use crate::foundation::{FunctionDef, Type};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// The last stage of a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Action {
    Invocation(Invocation),
    /// Call to a declared action or program
    VarRef {
        name: String,
        in_params: Vec<InputParam>,
        #[serde(skip)]
        schema: Option<Arc<FunctionDef>>,
    },
}

/// What starts a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RuleTrigger {
    /// Run once, immediately
    Now,
    /// Run on every user input
    OnInput,
    Stream(Stream),
}

/// `trigger => query* => action`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub trigger: RuleTrigger,
    pub queries: Vec<Table>,
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclarationKind {
    Program,
    Query,
    Stream,
    Action,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DeclarationBody {
    Program(Vec<Rule>),
    Query(Table),
    Stream(Stream),
    Action(Action),
}

/// Natural-language (`#_[...]`) and implementation (`#[...]`) annotations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Annotations {
    pub nl: IndexMap<String, Value>,
    pub implementation: IndexMap<String, Value>,
}

/// `let kind name(params) := body;`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declaration {
    pub name: String,
    pub params: IndexMap<String, Type>,
    pub body: DeclarationBody,
    pub annotations: Annotations,
}

/// One example of a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Example {
    pub params: IndexMap<String, Type>,
    pub body: DeclarationBody,
    pub annotations: Annotations,
}

/// `dataset @kind language 'xx' { example* }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub kind: String,
    pub language: String,
    pub examples: Vec<Example>,
}

/// Function pattern of a permission rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PermissionFunction {
    /// `now` in query position, `notify` in action position
    Builtin,
    /// `*`
    Star,
    /// `@kind.*`
    ClassStar(String),
    /// `@kind.channel, filter`
    Specified {
        kind: String,
        channel: String,
        filter: Filter,
        #[serde(skip)]
        schema: Option<Arc<FunctionDef>>,
    },
}

/// `principal_filter : query => action;`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionRule {
    pub principal: Filter,
    pub query: PermissionFunction,
    pub action: PermissionFunction,
}

/// Name and type of the contextual variable in permission filters.
pub const PERMISSION_SOURCE: (&str, &str) = ("source", "tt:contact");

impl DeclarationBody {
    pub fn kind(&self) -> DeclarationKind {
        match self {
            DeclarationBody::Program(_) => DeclarationKind::Program,
            DeclarationBody::Query(_) => DeclarationKind::Query,
            DeclarationBody::Stream(_) => DeclarationKind::Stream,
            DeclarationBody::Action(_) => DeclarationKind::Action,
        }
    }
}

impl DeclarationKind {
    pub fn name(self) -> &'static str {
        match self {
            DeclarationKind::Program => "program",
            DeclarationKind::Query => "query",
            DeclarationKind::Stream => "stream",
            DeclarationKind::Action => "action",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "program" => Some(DeclarationKind::Program),
            "query" => Some(DeclarationKind::Query),
            "stream" => Some(DeclarationKind::Stream),
            "action" => Some(DeclarationKind::Action),
            _ => None,
        }
    }
}

impl Example {
    /// The `utterances` annotation as plain strings.
    pub fn utterances(&self) -> Vec<&str> {
        match self.annotations.nl.get("utterances") {
            Some(Value::Array(values)) => values
                .iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s.as_str()),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl Annotations {
    pub fn is_empty(&self) -> bool {
        self.nl.is_empty() && self.implementation.is_empty()
    }
}

impl Action {
    pub fn in_params(&self) -> &[InputParam] {
        match self {
            Action::Invocation(inv) => &inv.in_params,
            Action::VarRef { in_params, .. } => in_params,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Invocation(inv) => write!(f, "{}", inv),
            Action::VarRef {
                name, in_params, ..
            } => {
                write!(f, "VarRef({}, ", name)?;
                display_params(f, in_params)?;
                f.write_str(", )")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_varref_action_display() {
        let action = Action::VarRef {
            name: "p1".into(),
            in_params: vec![InputParam::new("p_query", Value::undefined())],
            schema: None,
        };
        assert_eq!(
            action.to_string(),
            "VarRef(p1, InputParam(p_query, Undefined(true)), )"
        );
    }

    #[test]
    fn test_example_utterances() {
        let mut annotations = Annotations::default();
        annotations.nl.insert(
            "utterances".into(),
            Value::Array(vec![Value::String("notify me about new tweets".into())]),
        );
        let example = Example {
            params: IndexMap::new(),
            body: DeclarationBody::Action(Action::Invocation(Invocation::notify())),
            annotations,
        };
        assert_eq!(example.utterances(), vec!["notify me about new tweets"]);
        assert_eq!(example.body.kind(), DeclarationKind::Action);
    }
}
