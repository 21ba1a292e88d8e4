//! Reconciliation of Roles, RoleBindings and ServiceAccounts against Vault.
//!
//! Each trigger names a single object. Its reconcile re-reads that object and
//! everything it depends on from the store and rewrites the derived Vault
//! state in full, so missed, duplicated and reordered triggers all converge.

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod aggregate;
mod dispatch;
pub mod finalizer;
mod role;
mod role_binding;
mod service_account;


pub use self::dispatch::{Dispatcher, Kind, Trigger};
use std::sync::Arc;
use tracing::{debug, info};
use vault_rbac_controller_core::{
    k8s::{self, Lifecycle, Object, ResourceExt, ResourceId},
    Error, Gateway, Notify, ObjectStore, Reason, Result,
};

/// Shared dependencies of the reconcilers.
pub struct Context<S> {
    pub store: S,
    pub gateway: Gateway,
    pub events: Arc<dyn Notify>,

    /// Whether finalizers are added so Vault state is cleaned up on deletion.
    pub use_finalizers: bool,
}

/// The state a reconcile left an object in.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// The object does not exist, or is being deleted and needs no cleanup.
    Gone,

    /// The object's namespace is not watched; no reconciler ran.
    OutOfScope,

    /// The object does not describe anything to sync.
    Ignored,

    /// Vault reflects the object.
    Synced,

    /// The object's Vault state was cleaned up and its finalizer released.
    CleanedUp,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gone => "gone",
            Self::OutOfScope => "out_of_scope",
            Self::Ignored => "ignored",
            Self::Synced => "synced",
            Self::CleanedUp => "cleaned_up",
        }
    }
}

/// The result of a create/update reconcile.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Applied {
    Written(&'static str),
    Skipped(&'static str),
}

/// The kind-specific halves of the reconcile state machine.
#[async_trait::async_trait]
pub(crate) trait Reconcile: Object {
    /// Describes why the object is ignored, if it is.
    fn ignored(&self) -> Option<&'static str>;

    /// Writes the object's Vault state.
    async fn sync<S: ObjectStore>(&self, ctx: &Context<S>) -> Result<Applied>;

    /// Removes, or reduces, the object's Vault state ahead of its deletion.
    async fn cleanup<S: ObjectStore>(&self, ctx: &Context<S>) -> Result<()>;
}

// === impl Context ===

impl<S: ObjectStore> Context<S> {
    pub fn new(
        store: S,
        gateway: Gateway,
        events: Arc<dyn Notify>,
        use_finalizers: bool,
    ) -> Self {
        Self {
            store,
            gateway,
            events,
            use_finalizers,
        }
    }

    async fn publish<K: Object>(&self, obj: &K, reason: Reason, note: impl ToString) {
        self.events
            .publish(obj.object_ref(&()), reason, note.to_string())
            .await
    }
}

/// Drives one object through the reconcile state machine.
pub(crate) async fn reconcile<K, S>(ctx: &Context<S>, id: &ResourceId) -> Result<Outcome>
where
    K: Reconcile,
    S: ObjectStore,
{
    let obj = match ctx.store.get::<K>(&id.namespace, &id.name).await? {
        Some(obj) => obj,
        None => {
            debug!("Object not found");
            return Ok(Outcome::Gone);
        }
    };

    let res = match Lifecycle::of(&obj) {
        Lifecycle::Released => {
            debug!("Deleting without a finalizer; nothing to clean up");
            return Ok(Outcome::Gone);
        }
        Lifecycle::Terminating => cleanup(ctx, &obj).await,
        Lifecycle::Untracked | Lifecycle::Tracked => {
            if let Some(note) = obj.ignored() {
                info!(%note, "Ignored");
                ctx.publish(&obj, Reason::Ignored, note).await;
                return Ok(Outcome::Ignored);
            }
            sync(ctx, &obj).await
        }
    };

    if let Err(error) = &res {
        ctx.publish(&obj, Reason::Error, error).await;
    }
    res
}

async fn sync<K, S>(ctx: &Context<S>, obj: &K) -> Result<Outcome>
where
    K: Reconcile,
    S: ObjectStore,
{
    match obj.sync(ctx).await? {
        Applied::Skipped(note) => {
            info!(%note, "Ignored");
            ctx.publish(obj, Reason::Ignored, note).await;
            Ok(Outcome::Ignored)
        }
        Applied::Written(note) => {
            if ctx.use_finalizers {
                finalizer::ensure(&ctx.store, obj).await?;
            }
            info!("Synced");
            ctx.publish(obj, Reason::Synced, note).await;
            Ok(Outcome::Synced)
        }
    }
}

async fn cleanup<K, S>(ctx: &Context<S>, obj: &K) -> Result<Outcome>
where
    K: Reconcile,
    S: ObjectStore,
{
    obj.cleanup(ctx).await?;
    finalizer::release(&ctx.store, obj).await?;
    info!("Cleaned up");
    Ok(Outcome::CleanedUp)
}

/// Fetches a ConfigMap referenced from `obj`.
pub(crate) async fn config_map<S, K>(
    store: &S,
    obj: &K,
    name: &str,
) -> Result<(ResourceId, Option<k8s::ConfigMap>)>
where
    S: ObjectStore,
    K: ResourceExt,
{
    let id = vault_rbac_controller_core::acl::config_map_id(obj, name);
    let cm = store.get::<k8s::ConfigMap>(&id.namespace, &id.name).await?;
    Ok((id, cm))
}

/// Fetches the ConfigMap of auth role parameters referenced from `obj`. A
/// reference to a missing ConfigMap is an error.
pub(crate) async fn role_config<S, K>(store: &S, obj: &K) -> Result<Option<k8s::ConfigMap>>
where
    S: ObjectStore,
    K: ResourceExt,
{
    let Some(name) = vault_rbac_controller_core::params::role_config_map(obj) else {
        return Ok(None);
    };
    match config_map(store, obj, name).await? {
        (_, Some(cm)) => Ok(Some(cm)),
        (id, None) => Err(Error::ConfigMapNotFound(id)),
    }
}
