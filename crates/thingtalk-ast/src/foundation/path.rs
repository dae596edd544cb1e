//! Addresses of nodes inside a `Program`.
//!
//! A `NodePath` is a list of steps from the program root, rendered as
//! `rules[0].queries[1].right.in_params.status`. The type checker uses it to
//! locate errors and the slot iterator uses it to address fillable values
//! (see `Program::value_at_mut`).

use serde::{Deserialize, Serialize};
use std::fmt;

/// One step of a node path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathStep {
    /// Named child field (`rules`, `left`, `filter`)
    Field(String),
    /// Named entry of a keyed list (a parameter or attribute name)
    Key(String),
    /// Positional child
    Index(usize),
}

/// Path from the program root to a node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodePath {
    steps: Vec<PathStep>,
}

impl NodePath {
    /// The program root.
    pub fn root() -> Self {
        Self { steps: Vec::new() }
    }

    /// Extend with a named field.
    pub fn field(&self, name: &str) -> Self {
        self.with(PathStep::Field(name.to_string()))
    }

    /// Extend with a keyed entry.
    pub fn key(&self, key: &str) -> Self {
        self.with(PathStep::Key(key.to_string()))
    }

    /// Extend with a positional index.
    pub fn index(&self, index: usize) -> Self {
        self.with(PathStep::Index(index))
    }

    fn with(&self, step: PathStep) -> Self {
        let mut steps = self.steps.clone();
        steps.push(step);
        Self { steps }
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    pub fn is_root(&self) -> bool {
        self.steps.is_empty()
    }

    /// Last step, if any.
    pub fn last(&self) -> Option<&PathStep> {
        self.steps.last()
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.steps.is_empty() {
            return f.write_str("<program>");
        }
        for (i, step) in self.steps.iter().enumerate() {
            match step {
                PathStep::Field(name) | PathStep::Key(name) => {
                    if i > 0 {
                        f.write_str(".")?;
                    }
                    f.write_str(name)?;
                }
                PathStep::Index(idx) => write!(f, "[{}]", idx)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let path = NodePath::root()
            .field("rules")
            .index(0)
            .field("queries")
            .index(1)
            .field("right")
            .field("in_params")
            .key("status");
        assert_eq!(path.to_string(), "rules[0].queries[1].right.in_params.status");
        assert_eq!(NodePath::root().to_string(), "<program>");
    }

    #[test]
    fn test_builders_do_not_alias() {
        let base = NodePath::root().field("rules");
        let a = base.index(0);
        let b = base.index(1);
        assert_ne!(a, b);
        assert_eq!(base.steps().len(), 1);
        assert_eq!(a.last(), Some(&PathStep::Index(0)));
    }
}
