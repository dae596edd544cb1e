//! Channel schemas: the typed signatures of device functions.
//!
//! A `ClassDef` describes one device kind with its triggers, queries and
//! actions. Each function is a `FunctionDef` listing its arguments in
//! declaration order; that order is the canonical order of `in_params`.

use super::types::Type;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Direction of a function argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgDirection {
    /// Required input
    InReq,
    /// Optional input
    InOpt,
    /// Output
    Out,
}

/// One argument of a function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgumentDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: Type,
    pub direction: ArgDirection,
    /// Natural-language question asked to fill this argument
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub question: String,
}

/// Role of a function within its class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionType {
    Trigger,
    Query,
    Action,
}

/// Signature of a device function, or the derived signature of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDef {
    pub kind: String,
    pub channel: String,
    pub function_type: FunctionType,
    pub args: Vec<ArgumentDef>,
    pub is_list: bool,
    pub is_monitorable: bool,
}

/// All functions of one device kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDef {
    pub kind: String,
    pub triggers: IndexMap<String, Arc<FunctionDef>>,
    pub queries: IndexMap<String, Arc<FunctionDef>>,
    pub actions: IndexMap<String, Arc<FunctionDef>>,
}

impl ArgumentDef {
    pub fn new(name: &str, ty: Type, direction: ArgDirection) -> Self {
        Self {
            name: name.to_string(),
            ty,
            direction,
            question: String::new(),
        }
    }

    pub fn with_question(mut self, question: &str) -> Self {
        self.question = question.to_string();
        self
    }

    pub fn is_input(&self) -> bool {
        matches!(self.direction, ArgDirection::InReq | ArgDirection::InOpt)
    }

    pub fn is_required(&self) -> bool {
        self.direction == ArgDirection::InReq
    }

    /// The question, if the schema provides one.
    pub fn question(&self) -> Option<&str> {
        (!self.question.is_empty()).then_some(self.question.as_str())
    }
}

impl FunctionDef {
    pub fn new(kind: &str, channel: &str, function_type: FunctionType) -> Self {
        Self {
            kind: kind.to_string(),
            channel: channel.to_string(),
            function_type,
            args: Vec::new(),
            is_list: false,
            is_monitorable: false,
        }
    }

    /// Signature of a derived table (join, aggregate, projection...).
    pub fn derived(args: Vec<ArgumentDef>, is_list: bool, is_monitorable: bool) -> Self {
        Self {
            kind: String::new(),
            channel: String::new(),
            function_type: FunctionType::Query,
            args,
            is_list,
            is_monitorable,
        }
    }

    pub fn with_arg(mut self, arg: ArgumentDef) -> Self {
        self.args.push(arg);
        self
    }

    pub fn arg(&self, name: &str) -> Option<&ArgumentDef> {
        self.args.iter().find(|a| a.name == name)
    }

    /// Position of an argument in declaration order.
    pub fn arg_index(&self, name: &str) -> Option<usize> {
        self.args.iter().position(|a| a.name == name)
    }

    pub fn inputs(&self) -> impl Iterator<Item = &ArgumentDef> {
        self.args.iter().filter(|a| a.is_input())
    }

    pub fn outputs(&self) -> impl Iterator<Item = &ArgumentDef> {
        self.args.iter().filter(|a| a.direction == ArgDirection::Out)
    }

    /// `kind.channel`, or `<derived>` for computed signatures.
    pub fn qualified_name(&self) -> String {
        if self.kind.is_empty() {
            "<derived>".to_string()
        } else {
            format!("{}.{}", self.kind, self.channel)
        }
    }
}

impl ClassDef {
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            triggers: IndexMap::new(),
            queries: IndexMap::new(),
            actions: IndexMap::new(),
        }
    }

    /// Add a function to the table matching its function type.
    pub fn add_function(&mut self, function: FunctionDef) {
        let channel = function.channel.clone();
        let table = match function.function_type {
            FunctionType::Trigger => &mut self.triggers,
            FunctionType::Query => &mut self.queries,
            FunctionType::Action => &mut self.actions,
        };
        table.insert(channel, Arc::new(function));
    }

    pub fn function(&self, channel: &str, function_type: FunctionType) -> Option<&Arc<FunctionDef>> {
        match function_type {
            FunctionType::Trigger => self.triggers.get(channel),
            FunctionType::Query => self.queries.get(channel),
            FunctionType::Action => self.actions.get(channel),
        }
    }
}

impl fmt::Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionType::Trigger => f.write_str("trigger"),
            FunctionType::Query => f.write_str("query"),
            FunctionType::Action => f.write_str("action"),
        }
    }
}
