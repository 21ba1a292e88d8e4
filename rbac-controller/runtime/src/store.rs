use kube::api::{Api, ListParams, PostParams};
use vault_rbac_controller_core::{
    k8s::{self, Object, ResourceExt, ResourceId},
    Error, ObjectStore, Result,
};

/// Reads and updates objects through the Kubernetes API.
///
/// Reads go to the API server rather than a watch cache so that every
/// reconcile acts on the latest committed state.
#[derive(Clone)]
pub struct KubeStore {
    client: kube::Client,
}

// === impl KubeStore ===

impl KubeStore {
    pub fn new(client: kube::Client) -> Self {
        Self { client }
    }

    fn api<K: Object>(&self, namespace: &str) -> Api<K> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait::async_trait]
impl ObjectStore for KubeStore {
    async fn get<K: Object>(&self, namespace: &str, name: &str) -> Result<Option<K>> {
        self.api(namespace)
            .get_opt(name)
            .await
            .map_err(|e| Error::Store(e.into()))
    }

    async fn list<K: Object>(&self, namespace: &str) -> Result<Vec<K>> {
        let list = self
            .api(namespace)
            .list(&ListParams::default())
            .await
            .map_err(|e| Error::Store(e.into()))?;
        Ok(list.items)
    }

    async fn update<K: Object>(&self, obj: &K) -> Result<K> {
        let namespace = obj.namespace().unwrap_or_default();
        match self
            .api::<K>(&namespace)
            .replace(&obj.name_any(), &PostParams::default(), obj)
            .await
        {
            Ok(obj) => Ok(obj),
            Err(kube::Error::Api(rsp)) if rsp.code == 409 => Err(Error::Conflict {
                kind: k8s::kind::<K>(),
                id: ResourceId::from_obj(obj),
            }),
            Err(error) => Err(Error::Store(error.into())),
        }
    }
}
