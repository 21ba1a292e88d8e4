use crate::{reconcile, Context, Outcome};
use std::{fmt, sync::Arc};
use tracing::{debug, info_span, Instrument};
use vault_rbac_controller_core::{
    k8s::{ResourceId, Role, RoleBinding, ServiceAccount},
    ObjectStore, Result, Scope,
};

/// The kinds of object the controller reconciles.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Kind {
    Role,
    RoleBinding,
    ServiceAccount,
}

/// A request to reconcile one object.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Trigger {
    pub kind: Kind,
    pub id: ResourceId,
}

/// Routes triggers to the reconciler for their kind, dropping those outside
/// the watched namespaces.
pub struct Dispatcher<S> {
    ctx: Arc<Context<S>>,
    scope: Scope,
}

// === impl Kind ===

impl Kind {
    pub const ALL: [Self; 3] = [Self::Role, Self::RoleBinding, Self::ServiceAccount];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Role => "Role",
            Self::RoleBinding => "RoleBinding",
            Self::ServiceAccount => "ServiceAccount",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// === impl Trigger ===

impl Trigger {
    pub fn new(kind: Kind, id: ResourceId) -> Self {
        Self { kind, id }
    }
}

// === impl Dispatcher ===

impl<S: ObjectStore> Dispatcher<S> {
    pub fn new(ctx: Arc<Context<S>>, scope: Scope) -> Self {
        Self { ctx, scope }
    }

    pub fn context(&self) -> &Arc<Context<S>> {
        &self.ctx
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub async fn dispatch(&self, trigger: Trigger) -> Result<Outcome> {
        let Trigger { kind, id } = trigger;
        let span = info_span!(
            "reconcile",
            kind = %kind,
            namespace = %id.namespace,
            name = %id.name,
        );
        async move {
            if !self.scope.contains(&id.namespace) {
                debug!("Namespace is not watched");
                return Ok(Outcome::OutOfScope);
            }
            match kind {
                Kind::Role => reconcile::<Role, S>(&self.ctx, &id).await,
                Kind::RoleBinding => reconcile::<RoleBinding, S>(&self.ctx, &id).await,
                Kind::ServiceAccount => reconcile::<ServiceAccount, S>(&self.ctx, &id).await,
            }
        }
        .instrument(span)
        .await
    }
}

impl<S> fmt::Debug for Dispatcher<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}
