//! In-memory delegate over Thingpedia-style JSON.
//!
//! The document maps each device kind to its functions:
//!
//! ```json
//! {
//!   "com.xkcd": {
//!     "queries": {
//!       "get_comic": {
//!         "is_monitorable": true,
//!         "args": [
//!           { "name": "number", "type": "Number", "direction": "in_opt",
//!             "question": "What Xkcd comic do you want?" },
//!           { "name": "title", "type": "String", "direction": "out" }
//!         ]
//!       }
//!     },
//!     "metadata": { "name": "XKCD" }
//!   }
//! }
//! ```

use super::delegate::{DelegateError, SchemaDelegate};
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use thingtalk_ast::{ArgumentDef, ClassDef, FunctionDef, FunctionType};

#[derive(Debug, Deserialize)]
struct ClassJson {
    #[serde(default)]
    triggers: IndexMap<String, FunctionJson>,
    #[serde(default)]
    queries: IndexMap<String, FunctionJson>,
    #[serde(default)]
    actions: IndexMap<String, FunctionJson>,
    #[serde(default)]
    metadata: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct FunctionJson {
    #[serde(default)]
    args: Vec<ArgumentDef>,
    #[serde(default)]
    is_list: bool,
    #[serde(default)]
    is_monitorable: bool,
}

/// Delegate answering from classes held in memory.
///
/// Counts the class fetches it serves, so callers can observe caching.
#[derive(Debug, Default)]
pub struct MemorySchemaDelegate {
    classes: HashMap<String, ClassDef>,
    metadata: HashMap<String, serde_json::Value>,
    fetches: AtomicUsize,
}

impl MemorySchemaDelegate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every class of a JSON document.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let document: IndexMap<String, ClassJson> = serde_json::from_str(json)?;
        let mut delegate = Self::new();
        for (kind, class) in document {
            let mut def = ClassDef::new(&kind);
            let tables = [
                (FunctionType::Trigger, class.triggers),
                (FunctionType::Query, class.queries),
                (FunctionType::Action, class.actions),
            ];
            for (function_type, functions) in tables {
                for (channel, function) in functions {
                    let mut f = FunctionDef::new(&kind, &channel, function_type);
                    f.args = function.args;
                    f.is_list = function.is_list;
                    f.is_monitorable = function.is_monitorable;
                    def.add_function(f);
                }
            }
            if let Some(metadata) = class.metadata {
                delegate.metadata.insert(kind.clone(), metadata);
            }
            delegate.classes.insert(kind, def);
        }
        Ok(delegate)
    }

    pub fn add_class(&mut self, class: ClassDef) {
        self.classes.insert(class.kind.clone(), class);
    }

    /// Number of `fetch_class` calls served so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SchemaDelegate for MemorySchemaDelegate {
    async fn fetch_class(&self, kind: &str) -> Result<Option<ClassDef>, DelegateError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.classes.get(kind).cloned())
    }

    async fn fetch_metadata(&self, kind: &str) -> Result<Option<serde_json::Value>, DelegateError> {
        Ok(self.metadata.get(kind).cloned())
    }
}
