use crate::k8s::ResourceId;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The object changed between read and write. The write that won will
    /// trigger another reconcile, so this is never retried in place.
    #[error("{kind} {id} was modified concurrently")]
    Conflict { kind: String, id: ResourceId },

    #[error("object store request failed: {0}")]
    Store(#[source] BoxError),

    #[error("vault is unavailable: {0}")]
    AuthorityUnavailable(#[source] BoxError),

    #[error("vault rejected request to {path} ({status}): {message}")]
    AuthorityRejected {
        path: String,
        status: u16,
        message: String,
    },

    #[error("configmap {0} not found")]
    ConfigMapNotFound(ResourceId),

    #[error("configmap {0} does not have a {key} key", key = crate::k8s::annotations::POLICY_KEY)]
    MissingPolicyKey(ResourceId),

    #[error("role {0} not found")]
    RoleNotFound(ResourceId),
}

// === impl Error ===

impl Error {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Errors that will not resolve until someone edits a referenced object.
    pub fn is_configuration_missing(&self) -> bool {
        matches!(
            self,
            Self::ConfigMapNotFound(_) | Self::MissingPolicyKey(_) | Self::RoleNotFound(_)
        )
    }

    pub fn is_authority(&self) -> bool {
        matches!(
            self,
            Self::AuthorityUnavailable(_) | Self::AuthorityRejected { .. }
        )
    }
}
