use crate::{Applied, Context, Reconcile};
use vault_rbac_controller_core::{
    acl,
    k8s::{annotations, Role},
    names, ObjectStore, Result,
};

#[async_trait::async_trait]
impl Reconcile for Role {
    fn ignored(&self) -> Option<&'static str> {
        annotations::is_ignored(self).then_some("Role is marked as ignored")
    }

    async fn sync<S: ObjectStore>(&self, ctx: &Context<S>) -> Result<Applied> {
        let Some(policy) = acl::role_policy(self) else {
            return Ok(Applied::Skipped("Role does not contain any Vault ACLs"));
        };
        ctx.gateway
            .put_policy(&names::policy_name(self), &policy)
            .await?;
        Ok(Applied::Written("Synced Vault policy"))
    }

    async fn cleanup<S: ObjectStore>(&self, ctx: &Context<S>) -> Result<()> {
        ctx.gateway.delete_policy(&names::policy_name(self)).await
    }
}
