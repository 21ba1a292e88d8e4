use crate::{Applied, Context, Reconcile};
use vault_rbac_controller_core::{
    acl::{self, PolicySource},
    k8s::{annotations, ServiceAccount},
    names, params, ObjectStore, Result,
};

#[async_trait::async_trait]
impl Reconcile for ServiceAccount {
    fn ignored(&self) -> Option<&'static str> {
        if !annotations::is_bound(self) {
            return Some("ServiceAccount is not bound to Vault");
        }
        if acl::policy_source(self).is_none() {
            return Some("ServiceAccount does not reference a Vault policy");
        }
        None
    }

    async fn sync<S: ObjectStore>(&self, ctx: &Context<S>) -> Result<Applied> {
        let policy = match acl::policy_source(self) {
            Some(PolicySource::Inline(policy)) => policy.to_string(),
            Some(PolicySource::ConfigMap(name)) => {
                let (id, cm) = crate::config_map(&ctx.store, self, name).await?;
                acl::config_map_policy(id, cm.as_ref())?
            }
            None => {
                return Ok(Applied::Skipped(
                    "ServiceAccount does not reference a Vault policy",
                ))
            }
        };
        let role_config = crate::role_config(&ctx.store, self).await?;

        let policy_name = names::policy_name(self);
        ctx.gateway.put_policy(&policy_name, &policy).await?;

        let params = params::auth_parameters(self, vec![policy_name], role_config.as_ref());
        ctx.gateway
            .put_binding_record(&names::role_name(self), &params)
            .await?;
        Ok(Applied::Written("Synced Vault policy and auth role"))
    }

    async fn cleanup<S: ObjectStore>(&self, ctx: &Context<S>) -> Result<()> {
        ctx.gateway.delete_policy(&names::policy_name(self)).await?;
        ctx.gateway
            .delete_binding_record(&names::role_name(self))
            .await
    }
}
