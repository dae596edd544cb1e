//! Names visible to a stage.

use indexmap::IndexMap;
use thingtalk_ast::{FunctionDef, Type};

/// Variables in scope and whether `$event` refers to anything.
///
/// A scope is seeded with declaration parameters and grows with the outputs
/// of each stage, in program order. It is cloned rather than shared when a
/// nested expression needs extra names.
#[derive(Debug, Clone, Default)]
pub(super) struct Scope {
    vars: IndexMap<String, Type>,
    event: bool,
}

impl Scope {
    pub(super) fn with_params(params: &IndexMap<String, Type>) -> Self {
        Self {
            vars: params.clone(),
            event: false,
        }
    }

    pub(super) fn get(&self, name: &str) -> Option<&Type> {
        self.vars.get(name)
    }

    pub(super) fn has_event(&self) -> bool {
        self.event
    }

    /// Add the outputs of a stage that just ran.
    pub(super) fn bind_outputs(&mut self, schema: &FunctionDef) {
        for arg in schema.outputs() {
            self.vars.insert(arg.name.clone(), arg.ty.clone());
            self.event = true;
        }
    }

    /// This scope plus every field of `schema`, fields taking precedence.
    pub(super) fn with_fields(&self, schema: &FunctionDef) -> Self {
        let mut scope = self.clone();
        for arg in &schema.args {
            scope.vars.insert(arg.name.clone(), arg.ty.clone());
        }
        scope
    }
}
