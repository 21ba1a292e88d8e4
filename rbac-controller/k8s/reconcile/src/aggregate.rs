//! Fan-in of the policies bound through a Role.
//!
//! Every RoleBinding in a namespace that references the same Role contributes
//! to the policy set written for a binding. The set is recomputed from the
//! store on every call; nothing about previous results is remembered, which
//! is what lets concurrent edits converge through later triggers.

use std::collections::HashMap;
use tracing::trace;
use vault_rbac_controller_core::{
    acl,
    k8s::{annotations, BoundIdentities, Lifecycle, ResourceExt, Role, RoleBinding},
    names, ObjectStore, Result,
};

/// The kind of role a RoleBinding must reference to bind Vault policies.
pub const ROLE_KIND: &str = "Role";

/// True if `rb` currently contributes its role's policy: it opts in, is not
/// ignored and is not being deleted.
pub fn is_active(rb: &RoleBinding) -> bool {
    annotations::is_bound(rb) && !Lifecycle::of(rb).is_deleting()
}

/// Returns the name of the policy `role` contributes, if any.
pub fn role_policy_name(role: &Role) -> Option<String> {
    if annotations::is_ignored(role) || !acl::has_rules(role) {
        return None;
    }
    Some(names::policy_name(role))
}

/// Computes the policies bound through `binding`'s role by all active
/// bindings in its namespace that reference that role.
///
/// Policies are listed in the order the store lists bindings, without
/// duplicates. `binding` itself only contributes if it is active, so a
/// binding that is being deleted sees only what its siblings still bind.
pub async fn bound_policies<S: ObjectStore>(store: &S, binding: &RoleBinding) -> Result<Vec<String>> {
    let namespace = binding.namespace().unwrap_or_default();
    if binding.role_ref.kind != ROLE_KIND {
        return Ok(vec![]);
    }

    // Roles are looked up at most once per call.
    let mut roles = HashMap::<String, Option<String>>::new();
    let mut policies = Vec::new();
    for sibling in store.list::<RoleBinding>(&namespace).await? {
        if sibling.role_ref.kind != ROLE_KIND || sibling.role_ref.name != binding.role_ref.name {
            continue;
        }
        if !is_active(&sibling) {
            trace!(binding = %sibling.name_any(), "Skipping inactive binding");
            continue;
        }

        let role_name = &sibling.role_ref.name;
        let policy = match roles.get(role_name) {
            Some(policy) => policy.clone(),
            None => {
                let policy = store
                    .get::<Role>(&namespace, role_name)
                    .await?
                    .as_ref()
                    .and_then(role_policy_name);
                roles.insert(role_name.clone(), policy.clone());
                policy
            }
        };

        if let Some(policy) = policy {
            if !policies.contains(&policy) {
                policies.push(policy);
            }
        }
    }
    Ok(policies)
}

/// Lists the active bindings that write the same auth role as `binding`:
/// those in its namespace that reference the same Role and resolve to the
/// same role name. `binding` is included when it is itself active.
pub async fn record_owners<S: ObjectStore>(
    store: &S,
    binding: &RoleBinding,
) -> Result<Vec<RoleBinding>> {
    let namespace = binding.namespace().unwrap_or_default();
    let role_name = names::role_name(binding);
    let owners = store
        .list::<RoleBinding>(&namespace)
        .await?
        .into_iter()
        .filter(|rb| {
            rb.role_ref.kind == ROLE_KIND
                && rb.role_ref.name == binding.role_ref.name
                && names::role_name(rb) == role_name
                && is_active(rb)
        })
        .collect();
    Ok(owners)
}

/// The service accounts bound by any of `bindings`, in order and without
/// duplicates.
pub fn bound_service_accounts<'a>(
    bindings: impl IntoIterator<Item = &'a RoleBinding>,
) -> Vec<String> {
    let mut names = Vec::new();
    for name in bindings.into_iter().flat_map(|rb| rb.bound_service_account_names()) {
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}
