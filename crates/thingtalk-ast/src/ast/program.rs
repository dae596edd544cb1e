//! The program root.

use super::statement::{Dataset, Declaration, DeclarationKind, PermissionRule, Rule};
use super::value::Value;
use serde::{Deserialize, Serialize};

/// A complete ThingTalk program.
///
/// Items are kept per category; the canonical order (and the order of every
/// traversal) is declarations, datasets, rules, permissions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    /// Who runs the program (`executor = v :`)
    pub principal: Option<Value>,
    pub declarations: Vec<Declaration>,
    pub datasets: Vec<Dataset>,
    pub rules: Vec<Rule>,
    pub permissions: Vec<PermissionRule>,
}

/// Reference to one top-level item.
#[derive(Debug, Clone, Copy)]
pub enum TopLevel<'a> {
    Declaration(usize, &'a Declaration),
    Dataset(usize, &'a Dataset),
    Rule(usize, &'a Rule),
    Permission(usize, &'a PermissionRule),
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
            && self.datasets.is_empty()
            && self.rules.is_empty()
            && self.permissions.is_empty()
    }

    /// Look up a declaration by name and kind.
    pub fn declaration(&self, name: &str, kind: DeclarationKind) -> Option<&Declaration> {
        self.declarations
            .iter()
            .find(|d| d.name == name && d.body.kind() == kind)
    }

    /// Top-level items in canonical order.
    pub fn items(&self) -> impl Iterator<Item = TopLevel<'_>> {
        let declarations = self
            .declarations
            .iter()
            .enumerate()
            .map(|(i, d)| TopLevel::Declaration(i, d));
        let datasets = self
            .datasets
            .iter()
            .enumerate()
            .map(|(i, d)| TopLevel::Dataset(i, d));
        let rules = self
            .rules
            .iter()
            .enumerate()
            .map(|(i, r)| TopLevel::Rule(i, r));
        let permissions = self
            .permissions
            .iter()
            .enumerate()
            .map(|(i, p)| TopLevel::Permission(i, p));
        declarations.chain(datasets).chain(rules).chain(permissions)
    }
}
