use crate::{ResourceExt, RoleBinding, ServiceAccount};

/// Objects that bind Kubernetes service accounts to a Vault auth role.
pub trait BoundIdentities: ResourceExt {
    /// Names of the service accounts, in the object's namespace, that may
    /// authenticate as the object's auth role.
    fn bound_service_account_names(&self) -> Vec<String>;
}

impl BoundIdentities for RoleBinding {
    fn bound_service_account_names(&self) -> Vec<String> {
        self.subjects
            .iter()
            .flatten()
            .filter(|s| s.kind == "ServiceAccount")
            .map(|s| s.name.clone())
            .collect()
    }
}

impl BoundIdentities for ServiceAccount {
    fn bound_service_account_names(&self) -> Vec<String> {
        vec![self.name_any()]
    }
}
