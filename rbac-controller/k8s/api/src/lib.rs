#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod annotations;
mod identities;
pub mod lifecycle;
mod resource_id;

pub use self::{identities::BoundIdentities, lifecycle::Lifecycle, resource_id::ResourceId};
pub use k8s_openapi::{
    NamespaceResourceScope,
    api::{
        core::v1::{ConfigMap, ObjectReference, ServiceAccount},
        rbac::v1::{PolicyRule, Role, RoleBinding, RoleRef, Subject},
    },
    apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time},
};
pub use kube::{Resource, ResourceExt};

/// A namespaced Kubernetes object that the controller can fetch, list and
/// update through an object store.
pub trait Object:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + std::fmt::Debug
    + serde::de::DeserializeOwned
    + serde::Serialize
    + Send
    + Sync
    + 'static
{
}

impl<T> Object for T where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + std::fmt::Debug
        + serde::de::DeserializeOwned
        + serde::Serialize
        + Send
        + Sync
        + 'static
{
}

/// The kind name of an object type, e.g. `RoleBinding`.
pub fn kind<K: Object>() -> String {
    K::kind(&()).into_owned()
}
