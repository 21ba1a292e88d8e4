use crate::{aggregate, Applied, Context, Reconcile};
use tracing::{debug, warn};
use vault_rbac_controller_core::{
    acl,
    k8s::{annotations, ResourceExt, ResourceId, Role, RoleBinding},
    names, params, Error, ObjectStore, Result,
};

#[async_trait::async_trait]
impl Reconcile for RoleBinding {
    fn ignored(&self) -> Option<&'static str> {
        if !annotations::is_bound(self) {
            return Some("RoleBinding is not bound to Vault");
        }
        if self.role_ref.kind != aggregate::ROLE_KIND {
            return Some("RoleBinding does not reference a Role");
        }
        None
    }

    async fn sync<S: ObjectStore>(&self, ctx: &Context<S>) -> Result<Applied> {
        let namespace = self.namespace().unwrap_or_default();
        let role = ctx
            .store
            .get::<Role>(&namespace, &self.role_ref.name)
            .await?
            .ok_or_else(|| Error::RoleNotFound(ResourceId::new(&namespace, &self.role_ref.name)))?;
        if !acl::has_rules(&role) {
            return Ok(Applied::Skipped("Role does not contain any Vault ACLs"));
        }

        let policies = aggregate::bound_policies(&ctx.store, self).await?;
        if policies.is_empty() {
            return Ok(Applied::Skipped("Role does not bind any Vault policies"));
        }

        // Bindings that resolve to the same role name share one auth role,
        // so it binds the service accounts of all of them.
        let owners = aggregate::record_owners(&ctx.store, self).await?;
        let service_accounts =
            aggregate::bound_service_accounts(owners.iter().chain(std::iter::once(self)));

        let role_config = crate::role_config(&ctx.store, self).await?;
        let mut params = params::auth_parameters(self, policies, role_config.as_ref());
        params.insert(
            params::BOUND_SERVICE_ACCOUNT_NAMES.to_string(),
            service_accounts.into(),
        );
        ctx.gateway
            .put_binding_record(&names::role_name(self), &params)
            .await?;
        Ok(Applied::Written("Synced Vault auth role"))
    }

    /// The auth role is deleted unless another active binding of the same
    /// Role writes it under the same name. In that case it is rewritten from
    /// the surviving bindings, so this binding's subjects lose access.
    async fn cleanup<S: ObjectStore>(&self, ctx: &Context<S>) -> Result<()> {
        let role_name = names::role_name(self);
        let owners = aggregate::record_owners(&ctx.store, self).await?;
        let policies = aggregate::bound_policies(&ctx.store, self).await?;
        let Some(survivor) = owners.first().filter(|_| !policies.is_empty()) else {
            return ctx.gateway.delete_binding_record(&role_name).await;
        };

        debug!(binding = %survivor.name_any(), ?policies, "Rewriting shared auth role");
        // A dangling parameters ConfigMap must not block deletion.
        let role_config = match crate::role_config(&ctx.store, survivor).await {
            Ok(cm) => cm,
            Err(error) if error.is_configuration_missing() => {
                warn!(%error, "Rewriting auth role without its parameters ConfigMap");
                None
            }
            Err(error) => return Err(error),
        };
        let mut params = params::auth_parameters(survivor, policies, role_config.as_ref());
        params.insert(
            params::BOUND_SERVICE_ACCOUNT_NAMES.to_string(),
            aggregate::bound_service_accounts(&owners).into(),
        );
        ctx.gateway.put_binding_record(&role_name, &params).await
    }
}
