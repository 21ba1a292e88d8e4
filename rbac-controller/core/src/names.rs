//! Names of the Vault artifacts derived from an object.

use crate::k8s::{annotations, ResourceExt};

/// The name used when no override annotation is present.
pub fn default_name(namespace: &str, name: &str) -> String {
    format!("{namespace}-{name}")
}

pub fn policy_name<K: ResourceExt>(obj: &K) -> String {
    annotated_or_default(obj, annotations::POLICY_NAME)
}

pub fn role_name<K: ResourceExt>(obj: &K) -> String {
    annotated_or_default(obj, annotations::ROLE_NAME)
}

fn annotated_or_default<K: ResourceExt>(obj: &K, annotation: &str) -> String {
    match annotations::get(obj, annotation) {
        Some(name) => name.to_string(),
        None => default_name(&obj.namespace().unwrap_or_default(), &obj.name_any()),
    }
}
