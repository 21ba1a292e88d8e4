//! The annotations recognized on Roles, RoleBindings and ServiceAccounts.

use crate::ResourceExt;

/// Opts a RoleBinding or ServiceAccount in to being synced to Vault.
pub const BIND: &str = "vault.hashicorp.com/bind";

/// Excludes an object from being synced, regardless of any other annotation.
pub const IGNORE: &str = "vault.hashicorp.com/ignore";

/// Overrides the name of the auth role written for an object.
pub const ROLE_NAME: &str = "vault.hashicorp.com/role-name";

/// Names a ConfigMap, in the object's namespace, holding auth role parameters.
pub const ROLE_CONFIG_MAP: &str = "vault.hashicorp.com/configmap";

/// Overrides the name of the policy written for an object.
pub const POLICY_NAME: &str = "vault.hashicorp.com/policy-name";

/// A policy document for a ServiceAccount, inline.
pub const INLINE_POLICY: &str = "vault.hashicorp.com/inline-policy";

/// Names a ConfigMap, in the ServiceAccount's namespace, holding its policy
/// under [`POLICY_KEY`].
pub const CONFIG_MAP_POLICY: &str = "vault.hashicorp.com/configmap-policy";

/// The ConfigMap key that holds a policy document.
pub const POLICY_KEY: &str = "policy.hcl";

pub const AUDIENCE: &str = "vault.hashicorp.com/audience";
pub const ALIAS_NAME_SOURCE: &str = "vault.hashicorp.com/alias-name-source";
pub const TOKEN_TTL: &str = "vault.hashicorp.com/token-ttl";
pub const TOKEN_MAX_TTL: &str = "vault.hashicorp.com/token-max-ttl";
pub const TOKEN_BOUND_CIDRS: &str = "vault.hashicorp.com/token-bound-cidrs";
pub const TOKEN_EXPLICIT_MAX_TTL: &str = "vault.hashicorp.com/token-explicit-max-ttl";
pub const TOKEN_NO_DEFAULT_POLICY: &str = "vault.hashicorp.com/token-no-default-policy";
pub const TOKEN_NUM_USES: &str = "vault.hashicorp.com/token-num-uses";
pub const TOKEN_PERIOD: &str = "vault.hashicorp.com/token-period";
pub const TOKEN_TYPE: &str = "vault.hashicorp.com/token-type";

/// Auth role tuning annotations and the role parameter each one sets.
pub const ROLE_PARAMETERS: [(&str, &str); 10] = [
    (AUDIENCE, "audience"),
    (ALIAS_NAME_SOURCE, "alias_name_source"),
    (TOKEN_TTL, "token_ttl"),
    (TOKEN_MAX_TTL, "token_max_ttl"),
    (TOKEN_BOUND_CIDRS, "token_bound_cidrs"),
    (TOKEN_EXPLICIT_MAX_TTL, "token_explicit_max_ttl"),
    (TOKEN_NO_DEFAULT_POLICY, "token_no_default_policy"),
    (TOKEN_NUM_USES, "token_num_uses"),
    (TOKEN_PERIOD, "token_period"),
    (TOKEN_TYPE, "token_type"),
];

pub fn get<'o, K: ResourceExt>(obj: &'o K, key: &str) -> Option<&'o str> {
    obj.annotations().get(key).map(String::as_str)
}

/// Presence is what matters for marker annotations; the value is not read.
pub fn has<K: ResourceExt>(obj: &K, key: &str) -> bool {
    obj.annotations().contains_key(key)
}

pub fn is_ignored<K: ResourceExt>(obj: &K) -> bool {
    has(obj, IGNORE)
}

/// True if the object opts in to syncing and does not opt out.
pub fn is_bound<K: ResourceExt>(obj: &K) -> bool {
    has(obj, BIND) && !is_ignored(obj)
}
