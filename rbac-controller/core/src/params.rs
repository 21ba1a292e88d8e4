//! Parameters of the Vault kubernetes-auth role written for an object.

use crate::k8s::{annotations, BoundIdentities, ConfigMap, ResourceExt};
use serde_json::Value;
use std::collections::BTreeMap;

pub type Parameters = BTreeMap<String, Value>;

pub const BOUND_SERVICE_ACCOUNT_NAMES: &str = "bound_service_account_names";
pub const BOUND_SERVICE_ACCOUNT_NAMESPACES: &str = "bound_service_account_namespaces";
pub const POLICIES: &str = "policies";

/// Returns the name of the ConfigMap holding auth role parameters for `obj`,
/// if it references one.
pub fn role_config_map<K: ResourceExt>(obj: &K) -> Option<&str> {
    annotations::get(obj, annotations::ROLE_CONFIG_MAP)
}

/// Builds the auth role parameters for `obj`.
///
/// The bound identities and policies are always set. Entries from
/// `role_config` (the ConfigMap named by [`role_config_map`]) are merged next,
/// with dashes in keys replaced by underscores. Recognized tuning annotations
/// are applied last and so override ConfigMap values for the same parameter.
pub fn auth_parameters<K: BoundIdentities>(
    obj: &K,
    policies: Vec<String>,
    role_config: Option<&ConfigMap>,
) -> Parameters {
    let mut params = Parameters::new();
    params.insert(
        BOUND_SERVICE_ACCOUNT_NAMES.to_string(),
        Value::from(obj.bound_service_account_names()),
    );
    params.insert(
        BOUND_SERVICE_ACCOUNT_NAMESPACES.to_string(),
        Value::from(vec![obj.namespace().unwrap_or_default()]),
    );
    params.insert(POLICIES.to_string(), Value::from(policies));

    for (key, value) in role_config.and_then(|cm| cm.data.as_ref()).into_iter().flatten() {
        params.insert(key.replace('-', "_"), Value::from(value.as_str()));
    }

    for (annotation, param) in annotations::ROLE_PARAMETERS {
        if let Some(value) = annotations::get(obj, annotation) {
            params.insert(param.to_string(), Value::from(value));
        }
    }

    params
}
