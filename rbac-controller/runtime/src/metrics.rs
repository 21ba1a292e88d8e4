use prometheus_client::{
    encoding::EncodeLabelSet,
    metrics::{counter::Counter, family::Family},
    registry::Registry,
};
use vault_rbac_controller_core::Result;
use vault_rbac_controller_k8s_reconcile::{Kind, Outcome};

#[derive(Clone, Debug, Default)]
pub struct ReconcileMetrics {
    reconciles: Family<OutcomeLabels, Counter>,
    errors: Family<KindLabels, Counter>,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct OutcomeLabels {
    kind: &'static str,
    outcome: &'static str,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct KindLabels {
    kind: &'static str,
}

// === impl ReconcileMetrics ===

impl ReconcileMetrics {
    pub fn register(reg: &mut Registry) -> Self {
        let metrics = Self::default();
        reg.register(
            "reconcile",
            "Total number of reconciles by object kind and outcome",
            metrics.reconciles.clone(),
        );
        reg.register(
            "reconcile_errors",
            "Total number of reconciles that failed, by object kind",
            metrics.errors.clone(),
        );
        metrics
    }

    pub fn record(&self, kind: Kind, result: &Result<Outcome>) {
        let outcome = match result {
            Ok(outcome) => outcome.as_str(),
            Err(_) => {
                self.errors
                    .get_or_create(&KindLabels {
                        kind: kind.as_str(),
                    })
                    .inc();
                "error"
            }
        };
        self.reconciles
            .get_or_create(&OutcomeLabels {
                kind: kind.as_str(),
                outcome,
            })
            .inc();
    }
}
