use crate::{
    controller::{self, Shared},
    events::KubeRecorder,
    health::VaultHealth,
    lease,
    metrics::ReconcileMetrics,
    store::KubeStore,
};
use anyhow::{bail, Context as _, Result};
use clap::Parser;
use prometheus_client::registry::Registry;
use std::{path::PathBuf, sync::Arc, time::Duration};
use tracing::{info, info_span, warn, Instrument};
use vault_rbac_controller_core::{Gateway, Scope};
use vault_rbac_controller_k8s_reconcile::{Context, Dispatcher};
use vault_rbac_controller_vault as vault;

#[derive(Debug, Parser)]
#[clap(
    name = "vault-rbac-controller",
    about = "Syncs Vault policies and auth roles from Kubernetes RBAC objects"
)]
pub struct Args {
    #[clap(
        long,
        default_value = "vault_rbac_controller=info,warn",
        env = "VAULT_RBAC_CONTROLLER_LOG"
    )]
    log_level: kubert::LogFilter,

    #[clap(long, default_value = "plain")]
    log_format: kubert::LogFormat,

    #[clap(flatten)]
    client: kubert::ClientArgs,

    #[clap(flatten)]
    admin: kubert::AdminArgs,

    /// The Vault auth mount auth roles are written under.
    #[clap(long, default_value = "kubernetes")]
    auth_mount: String,

    /// Adds finalizers so that Vault state is removed when objects are
    /// deleted.
    #[clap(long)]
    use_finalizers: bool,

    /// Namespaces to watch. All namespaces are watched when empty.
    #[clap(long, value_delimiter = ',')]
    namespaces: Vec<String>,

    #[clap(long, value_delimiter = ',')]
    exclude_namespaces: Vec<String>,

    /// Watches kube-system, kube-public and kube-node-lease too.
    #[clap(long)]
    include_system_namespaces: bool,

    /// Only reconciles while holding the leadership Lease.
    #[clap(long)]
    leader_elect: bool,

    #[clap(long, default_value = "default", env = "POD_NAMESPACE")]
    lease_namespace: String,

    #[clap(long, default_value = "https://127.0.0.1:8200", env = "VAULT_ADDR")]
    vault_addr: String,

    #[clap(long, env = "VAULT_TOKEN", hide_env_values = true)]
    vault_token: Option<String>,

    /// A file holding the Vault token, re-read for every request.
    #[clap(long, env = "VAULT_TOKEN_FILE", conflicts_with = "vault_token")]
    vault_token_file: Option<PathBuf>,

    #[clap(long, env = "VAULT_NAMESPACE")]
    vault_namespace: Option<String>,

    #[clap(long, default_value = "30000")]
    vault_timeout_ms: u64,

    /// How often Vault's health is checked and exported as `vault_up`.
    #[clap(long, default_value = "30")]
    vault_health_interval_secs: u64,

    /// How often synced objects are reconciled again without a change.
    #[clap(long, default_value = "36000")]
    resync_interval_secs: u64,
}

impl Args {
    #[inline]
    pub async fn parse_and_run() -> Result<()> {
        Self::parse().run().await
    }

    pub async fn run(self) -> Result<()> {
        let scope = self.scope();
        let vault_config = self.vault_config();
        let Self {
            admin,
            client,
            log_level,
            log_format,
            auth_mount,
            use_finalizers,
            leader_elect,
            lease_namespace,
            resync_interval_secs,
            vault_health_interval_secs,
            ..
        } = self;

        let mut prom = <Registry>::default();
        let metrics = ReconcileMetrics::register(&mut prom);
        let vault_health = VaultHealth::register(&mut prom);
        let rt_metrics = kubert::RuntimeMetrics::register(prom.sub_registry_with_prefix("kube"));

        let runtime = kubert::Runtime::builder()
            .with_log(log_level, log_format)
            .with_metrics(rt_metrics)
            .with_admin(admin.into_builder().with_prometheus(prom))
            .with_client(client)
            .build()
            .await?;

        let vault = Arc::new(
            vault::Client::new(vault_config).context("failed to build Vault client")?,
        );
        if !vault_health.observe(&vault.health().await) {
            warn!("Starting without a healthy Vault");
        }
        tokio::spawn(
            vault_health
                .run(vault.clone(), Duration::from_secs(vault_health_interval_secs))
                .instrument(info_span!("vault_health")),
        );

        let hostname = std::env::var("HOSTNAME").ok();
        let events = KubeRecorder::new(runtime.client(), hostname.clone());
        let ctx = Context::new(
            KubeStore::new(runtime.client()),
            Gateway::new(vault, auth_mount),
            Arc::new(events),
            use_finalizers,
        );
        info!(?scope, use_finalizers, "Configured");
        let shared = Arc::new(Shared {
            dispatcher: Dispatcher::new(Arc::new(ctx), scope),
            metrics,
            resync: Duration::from_secs(resync_interval_secs),
        });

        let leadership = if leader_elect {
            let hostname = hostname.context("leader election requires HOSTNAME to be set")?;
            let mut claims = lease::init(&runtime, &lease_namespace, &hostname).await?;
            info!(%hostname, "Waiting for leadership");
            lease::acquired(&mut claims, &hostname).await?;
            info!(%hostname, "Acquired leadership");
            Some(lease::lost(claims, hostname))
        } else {
            None
        };

        let drain = runtime.shutdown_handle();
        let controllers = controller::run(runtime.client(), shared);
        tokio::spawn(
            async move {
                tokio::select! {
                    _ = controllers => {}
                    handle = drain.signaled() => {
                        info!("Stopping controllers");
                        drop(handle);
                    }
                }
            }
            .instrument(info_span!("controllers")),
        );

        // Block the main thread on the shutdown signal, or on losing the lease
        // so that another replica can take over.
        let lost = async move {
            match leadership {
                Some(lost) => lost.await,
                None => futures::future::pending().await,
            }
        };
        tokio::select! {
            res = runtime.run() => {
                if res.is_err() {
                    bail!("Aborted");
                }
            }
            _ = lost => bail!("Lost leadership"),
        }

        Ok(())
    }

    fn scope(&self) -> Scope {
        Scope {
            include: self.namespaces.clone(),
            exclude: self.exclude_namespaces.clone(),
            include_system: self.include_system_namespaces,
        }
    }

    fn vault_config(&self) -> vault::Config {
        let token = match (&self.vault_token, &self.vault_token_file) {
            (_, Some(path)) => vault::Token::File(path.clone()),
            (Some(token), None) => vault::Token::Static(token.clone()),
            (None, None) => vault::Token::None,
        };
        vault::Config {
            addr: self.vault_addr.clone(),
            token,
            namespace: self.vault_namespace.clone(),
            timeout: Duration::from_millis(self.vault_timeout_ms),
        }
    }
}
