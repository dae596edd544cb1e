use async_trait::async_trait;
use thingtalk_ast::ClassDef;
use thiserror::Error;

/// Transport failure reported by a delegate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct DelegateError(pub String);

/// Source of device class definitions, e.g. a Thingpedia client.
///
/// Both methods return `Ok(None)` when the kind does not exist and `Err`
/// only when the lookup itself failed.
#[async_trait]
pub trait SchemaDelegate: Send + Sync {
    /// Fetch the class definition of a device kind.
    async fn fetch_class(&self, kind: &str) -> Result<Option<ClassDef>, DelegateError>;

    /// Fetch the metadata (names, descriptions, canonical forms) of a kind.
    async fn fetch_metadata(&self, kind: &str) -> Result<Option<serde_json::Value>, DelegateError>;
}
