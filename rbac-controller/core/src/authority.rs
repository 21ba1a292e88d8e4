use crate::{Parameters, Result};
use std::sync::Arc;
use tracing::debug;

/// The Vault API operations the controller depends on.
///
/// Implementations must treat deleting an absent policy or path as success.
/// No compare-and-swap is available: every write overwrites.
#[async_trait::async_trait]
pub trait Authority: Send + Sync + 'static {
    async fn put_policy(&self, name: &str, policy: &str) -> Result<()>;

    async fn delete_policy(&self, name: &str) -> Result<()>;

    async fn write(&self, path: &str, params: &Parameters) -> Result<()>;

    async fn delete(&self, path: &str) -> Result<()>;
}

/// Writes and deletes the policies and auth roles derived from cluster
/// objects.
#[derive(Clone)]
pub struct Gateway {
    authority: Arc<dyn Authority>,
    auth_mount: String,
}

// === impl Gateway ===

impl Gateway {
    pub fn new(authority: Arc<dyn Authority>, auth_mount: impl Into<String>) -> Self {
        Self {
            authority,
            auth_mount: auth_mount.into(),
        }
    }

    pub async fn put_policy(&self, name: &str, document: &str) -> Result<()> {
        debug!(policy = %name, "Writing policy");
        self.authority.put_policy(name, document).await
    }

    pub async fn delete_policy(&self, name: &str) -> Result<()> {
        debug!(policy = %name, "Deleting policy");
        self.authority.delete_policy(name).await
    }

    pub async fn put_binding_record(&self, name: &str, params: &Parameters) -> Result<()> {
        let path = self.record_path(name);
        debug!(%path, "Writing auth role");
        self.authority.write(&path, params).await
    }

    pub async fn delete_binding_record(&self, name: &str) -> Result<()> {
        let path = self.record_path(name);
        debug!(%path, "Deleting auth role");
        self.authority.delete(&path).await
    }

    pub fn record_path(&self, name: &str) -> String {
        format!("auth/{}/role/{}", self.auth_mount.trim_matches('/'), name)
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("auth_mount", &self.auth_mount)
            .finish_non_exhaustive()
    }
}
