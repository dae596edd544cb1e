//! Shared, per-kind schema cache.
//!
//! Each kind owns a `tokio::sync::OnceCell` in a map guarded by a
//! `parking_lot` mutex. The mutex is only held to find or create the cell;
//! the fetch itself runs on the cell, so concurrent lookups of one kind wait
//! for a single delegate call while other kinds proceed. A failed or
//! cancelled fetch leaves the cell empty and the next lookup retries.

use super::builtin::{builtin_class, BUILTIN_KIND};
use super::delegate::SchemaDelegate;
use super::SchemaError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use thingtalk_ast::{ClassDef, FunctionDef, FunctionType};
use tokio::sync::OnceCell;
use tracing::debug;

type Slot<T> = Arc<OnceCell<T>>;

/// Resolves device kinds to class definitions through a delegate.
pub struct SchemaRetriever {
    delegate: Arc<dyn SchemaDelegate>,
    builtins: Arc<ClassDef>,
    classes: Mutex<HashMap<String, Slot<Arc<ClassDef>>>>,
    metadata: Mutex<HashMap<String, Slot<serde_json::Value>>>,
}

impl SchemaRetriever {
    pub fn new(delegate: Arc<dyn SchemaDelegate>) -> Self {
        Self {
            delegate,
            builtins: Arc::new(builtin_class()),
            classes: Mutex::new(HashMap::new()),
            metadata: Mutex::new(HashMap::new()),
        }
    }

    /// The engine's own functions.
    pub fn builtins(&self) -> &Arc<ClassDef> {
        &self.builtins
    }

    /// Class definition of a device kind.
    ///
    /// # Errors
    ///
    /// `UnknownSchema` if the delegate does not know the kind, `Transport`
    /// if the delegate failed.
    pub async fn get_schema(&self, kind: &str) -> Result<Arc<ClassDef>, SchemaError> {
        if kind == BUILTIN_KIND {
            return Ok(self.builtins.clone());
        }

        let cell = slot(&self.classes, kind);
        if let Some(class) = cell.get() {
            debug!(kind, "schema cache hit");
            return Ok(class.clone());
        }

        let class = cell
            .get_or_try_init(|| async {
                debug!(kind, "fetching schema");
                match self.delegate.fetch_class(kind).await {
                    Ok(Some(class)) => Ok(Arc::new(class)),
                    Ok(None) => Err(SchemaError::UnknownSchema(kind.to_string())),
                    Err(e) => Err(SchemaError::Transport {
                        kind: kind.to_string(),
                        message: e.to_string(),
                    }),
                }
            })
            .await?;
        Ok(class.clone())
    }

    /// Signature of one function of a device kind.
    pub async fn get_function(
        &self,
        kind: &str,
        channel: &str,
        function_type: FunctionType,
    ) -> Result<Arc<FunctionDef>, SchemaError> {
        let class = self.get_schema(kind).await?;
        class
            .function(channel, function_type)
            .cloned()
            .ok_or_else(|| SchemaError::UnknownChannel {
                kind: kind.to_string(),
                channel: channel.to_string(),
                function_type,
            })
    }

    /// Opaque metadata of a device kind.
    pub async fn get_metadata(&self, kind: &str) -> Result<serde_json::Value, SchemaError> {
        let cell = slot(&self.metadata, kind);
        let metadata = cell
            .get_or_try_init(|| async {
                debug!(kind, "fetching metadata");
                match self.delegate.fetch_metadata(kind).await {
                    Ok(Some(metadata)) => Ok(metadata),
                    Ok(None) => Err(SchemaError::UnknownSchema(kind.to_string())),
                    Err(e) => Err(SchemaError::Transport {
                        kind: kind.to_string(),
                        message: e.to_string(),
                    }),
                }
            })
            .await?;
        Ok(metadata.clone())
    }

    /// Whether the class of `kind` is cached.
    pub fn is_cached(&self, kind: &str) -> bool {
        self.classes
            .lock()
            .get(kind)
            .is_some_and(|cell| cell.initialized())
    }

    /// Drop the cached class and metadata of one kind.
    pub fn invalidate(&self, kind: &str) {
        debug!(kind, "invalidating schema");
        self.classes.lock().remove(kind);
        self.metadata.lock().remove(kind);
    }

    /// Drop every cached entry.
    pub fn clear(&self) {
        self.classes.lock().clear();
        self.metadata.lock().clear();
    }
}

/// Find or create the cell for `kind`.
fn slot<T>(map: &Mutex<HashMap<String, Slot<T>>>, kind: &str) -> Slot<T> {
    map.lock().entry(kind.to_string()).or_default().clone()
}
