//! Watches Roles, RoleBindings and ServiceAccounts and feeds reconcile
//! triggers to the dispatcher.
//!
//! Watch events only name the object that changed; the dispatcher re-reads
//! everything it needs from the API server. Changes to a Role or ConfigMap
//! trigger the objects that reference it.

use crate::{metrics::ReconcileMetrics, store::KubeStore};
use futures::prelude::*;
use kube::{
    runtime::{
        controller::Action,
        reflector::{ObjectRef, Store},
        watcher, Controller,
    },
    Api, Client,
};
use std::{fmt, sync::Arc, time::Duration};
use tracing::{debug, info};
use vault_rbac_controller_core::{
    k8s::{annotations, ConfigMap, Object, ResourceExt, ResourceId, Role, RoleBinding, ServiceAccount},
    Error, Result,
};
use vault_rbac_controller_k8s_reconcile::{aggregate, Dispatcher, Kind, Outcome, Trigger};

/// Requeue delay for errors that need someone to edit a referenced object.
const CONFIGURATION_RETRY: Duration = Duration::from_secs(5 * 60);

/// Requeue delay for all other errors.
const ERROR_RETRY: Duration = Duration::from_secs(30);

pub struct Shared {
    pub dispatcher: Dispatcher<KubeStore>,
    pub metrics: ReconcileMetrics,
    pub resync: Duration,
}

/// Ties an object type to the reconciler that handles it.
trait Watched: Object {
    const KIND: Kind;
}

impl Watched for Role {
    const KIND: Kind = Kind::Role;
}

impl Watched for RoleBinding {
    const KIND: Kind = Kind::RoleBinding;
}

impl Watched for ServiceAccount {
    const KIND: Kind = Kind::ServiceAccount;
}

/// Runs one controller per reconciled kind until they all stop.
pub async fn run(client: Client, shared: Arc<Shared>) {
    info!("Starting controllers");
    let roles = Controller::new(Api::<Role>::all(client.clone()), watcher::Config::default())
        .run(reconcile, error_policy, shared.clone())
        .for_each(log_result(Kind::Role));

    let bindings = Controller::new(
        Api::<RoleBinding>::all(client.clone()),
        watcher::Config::default(),
    );
    let binding_store = bindings.store();
    let config_store = binding_store.clone();
    let bindings = bindings
        .watches(
            Api::<Role>::all(client.clone()),
            watcher::Config::default(),
            move |role| bindings_of_role(&binding_store, &role),
        )
        .watches(
            Api::<ConfigMap>::all(client.clone()),
            watcher::Config::default(),
            move |cm| referencing(&config_store, &cm, &[annotations::ROLE_CONFIG_MAP]),
        )
        .run(reconcile, error_policy, shared.clone())
        .for_each(log_result(Kind::RoleBinding));

    let accounts = Controller::new(
        Api::<ServiceAccount>::all(client.clone()),
        watcher::Config::default(),
    );
    let account_store = accounts.store();
    let accounts = accounts
        .watches(
            Api::<ConfigMap>::all(client),
            watcher::Config::default(),
            move |cm| {
                referencing(
                    &account_store,
                    &cm,
                    &[annotations::CONFIG_MAP_POLICY, annotations::ROLE_CONFIG_MAP],
                )
            },
        )
        .run(reconcile, error_policy, shared)
        .for_each(log_result(Kind::ServiceAccount));

    tokio::join!(roles, bindings, accounts);
}

async fn reconcile<K: Watched>(obj: Arc<K>, shared: Arc<Shared>) -> Result<Action> {
    let trigger = Trigger::new(K::KIND, ResourceId::from_obj(&*obj));
    let res = shared.dispatcher.dispatch(trigger).await;
    shared.metrics.record(K::KIND, &res);
    res.map(|outcome| requeue_after(outcome, shared.resync))
}

fn error_policy<K: Watched>(_: Arc<K>, error: &Error, _: Arc<Shared>) -> Action {
    requeue_for(error)
}

fn requeue_after(outcome: Outcome, resync: Duration) -> Action {
    match outcome {
        Outcome::Synced => Action::requeue(resync),
        Outcome::Gone | Outcome::OutOfScope | Outcome::Ignored | Outcome::CleanedUp => {
            Action::await_change()
        }
    }
}

/// A conflict means another write landed first; that write produces its own
/// watch event.
fn requeue_for(error: &Error) -> Action {
    if error.is_conflict() {
        return Action::await_change();
    }
    if error.is_configuration_missing() {
        return Action::requeue(CONFIGURATION_RETRY);
    }
    Action::requeue(ERROR_RETRY)
}

fn bindings_of_role(store: &Store<RoleBinding>, role: &Role) -> Vec<ObjectRef<RoleBinding>> {
    let namespace = role.namespace();
    let name = role.name_any();
    let refs = store
        .state()
        .into_iter()
        .filter(|rb| {
            rb.namespace() == namespace
                && rb.role_ref.kind == aggregate::ROLE_KIND
                && rb.role_ref.name == name
        })
        .map(|rb| ObjectRef::from_obj(&*rb))
        .collect::<Vec<_>>();
    debug!(role = %name, bindings = refs.len(), "Role changed");
    refs
}

/// Finds the objects that name `cm` in one of `keys`.
fn referencing<K: Watched>(store: &Store<K>, cm: &ConfigMap, keys: &[&str]) -> Vec<ObjectRef<K>> {
    let namespace = cm.namespace();
    let name = cm.name_any();
    store
        .state()
        .into_iter()
        .filter(|obj| {
            obj.namespace() == namespace
                && keys
                    .iter()
                    .any(|key| annotations::get(&**obj, key) == Some(name.as_str()))
        })
        .map(|obj| ObjectRef::from_obj(&*obj))
        .collect()
}

fn log_result<T: fmt::Debug, E: fmt::Debug>(
    kind: Kind,
) -> impl Fn(std::result::Result<T, E>) -> future::Ready<()> {
    move |res| {
        match res {
            Ok(obj) => tracing::trace!(%kind, ?obj, "Reconciled"),
            Err(error) => tracing::debug!(%kind, ?error, "Reconcile failed"),
        }
        future::ready(())
    }
}
