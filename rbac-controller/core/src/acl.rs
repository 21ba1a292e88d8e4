//! Translation of Kubernetes objects into Vault policy documents.
//!
//! A Role grants Vault access through rules whose first API group is
//! [`VAULT_API_GROUP`]: each listed resource is a Vault path and the verbs
//! are the capabilities granted on it. A ServiceAccount instead carries its
//! policy verbatim, either inline or in a ConfigMap.

use crate::{
    k8s::{annotations, ConfigMap, PolicyRule, ResourceId, ResourceExt, Role, ServiceAccount},
    Error, Result,
};
use serde::Serialize;
use std::collections::BTreeMap;

pub const VAULT_API_GROUP: &str = "vault.hashicorp.com";

#[derive(Debug, Default, Serialize)]
struct PolicyDocument<'r> {
    path: BTreeMap<&'r str, PathPolicy<'r>>,
}

#[derive(Debug, Serialize)]
struct PathPolicy<'r> {
    capabilities: &'r [String],
}

/// Where a ServiceAccount's policy document comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PolicySource<'a> {
    Inline(&'a str),
    ConfigMap(&'a str),
}

/// Returns the rules that target Vault, preserving their order.
pub fn filter_rules(rules: &[PolicyRule]) -> Vec<PolicyRule> {
    rules.iter().filter(|r| is_vault_rule(r)).cloned().collect()
}

fn is_vault_rule(rule: &PolicyRule) -> bool {
    rule.api_groups
        .as_ref()
        .and_then(|groups| groups.first())
        .is_some_and(|group| group == VAULT_API_GROUP)
}

pub fn has_rules(role: &Role) -> bool {
    role.rules.iter().flatten().any(is_vault_rule)
}

/// Renders rules as a JSON policy document.
///
/// When several rules name the same path, the last one wins; verbs are never
/// merged. Paths are ordered lexicographically so the output is stable.
pub fn render_policy(rules: &[PolicyRule]) -> String {
    let mut doc = PolicyDocument::default();
    for rule in rules {
        for resource in rule.resources.iter().flatten() {
            doc.path.insert(
                resource.as_str(),
                PathPolicy {
                    capabilities: &rule.verbs,
                },
            );
        }
    }
    // String-keyed maps of string lists cannot fail to serialize.
    serde_json::to_string_pretty(&doc).expect("policy documents must serialize")
}

/// Renders the Vault rules of a role, or `None` if it has none.
pub fn role_policy(role: &Role) -> Option<String> {
    let rules = filter_rules(role.rules.as_deref().unwrap_or_default());
    if rules.is_empty() {
        return None;
    }
    Some(render_policy(&rules))
}

/// Returns the source of a ServiceAccount's policy. The inline annotation
/// takes precedence over a ConfigMap reference.
pub fn policy_source(sa: &ServiceAccount) -> Option<PolicySource<'_>> {
    if let Some(policy) = annotations::get(sa, annotations::INLINE_POLICY) {
        return Some(PolicySource::Inline(policy));
    }
    annotations::get(sa, annotations::CONFIG_MAP_POLICY).map(PolicySource::ConfigMap)
}

/// Extracts the policy document from the ConfigMap a ServiceAccount
/// references. `config_map` is the result of looking that ConfigMap up.
pub fn config_map_policy(id: ResourceId, config_map: Option<&ConfigMap>) -> Result<String> {
    let cm = config_map.ok_or_else(|| Error::ConfigMapNotFound(id.clone()))?;
    cm.data
        .as_ref()
        .and_then(|data| data.get(annotations::POLICY_KEY))
        .cloned()
        .ok_or(Error::MissingPolicyKey(id))
}

/// The namespace-qualified id of a ConfigMap referenced from `obj`.
pub fn config_map_id<K: ResourceExt>(obj: &K, name: &str) -> ResourceId {
    ResourceId::new(obj.namespace().unwrap_or_default(), name)
}
