use crate::{k8s::Object, Result};

/// Typed access to the cluster's object graph.
///
/// Nothing is cached between calls: every reconcile reads current state.
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// Fetches an object, returning `None` if it does not exist.
    async fn get<K: Object>(&self, namespace: &str, name: &str) -> Result<Option<K>>;

    /// Lists all objects of a kind in a namespace.
    async fn list<K: Object>(&self, namespace: &str) -> Result<Vec<K>>;

    /// Replaces an object, guarded by its resource version. A stale write
    /// fails with [`Error::Conflict`](crate::Error::Conflict).
    async fn update<K: Object>(&self, obj: &K) -> Result<K>;
}
