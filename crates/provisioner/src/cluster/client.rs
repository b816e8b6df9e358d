use super::{selector_string, ClusterApi, LabelSet};
use crate::crds::{AKSNodeClass, EC2NodeClass, NodeClaim, NodeClassKind, NodeClassManifest};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Node;
use kube::api::{Api, DeleteParams, ListParams, PostParams};
use kube::Client;

/// [`ClusterApi`] backed by a live API server
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
}

impl KubeCluster {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn try_default() -> kube::Result<Self> {
        Ok(Self::new(Client::try_default().await?))
    }

    fn node_claims(&self) -> Api<NodeClaim> {
        Api::all(self.client.clone())
    }
}

fn list_params(selector: &LabelSet) -> ListParams {
    if selector.is_empty() {
        ListParams::default()
    } else {
        ListParams::default().labels(&selector_string(selector))
    }
}

#[async_trait]
impl ClusterApi for KubeCluster {
    async fn get_node_claim(&self, name: &str) -> kube::Result<NodeClaim> {
        self.node_claims().get(name).await
    }

    async fn create_node_claim(&self, claim: &NodeClaim) -> kube::Result<NodeClaim> {
        self.node_claims()
            .create(&PostParams::default(), claim)
            .await
    }

    async fn delete_node_claim(&self, name: &str) -> kube::Result<()> {
        self.node_claims()
            .delete(name, &DeleteParams::default())
            .await
            .map(|_| ())
    }

    async fn list_node_claims(&self, selector: &LabelSet) -> kube::Result<Vec<NodeClaim>> {
        Ok(self.node_claims().list(&list_params(selector)).await?.items)
    }

    async fn node_class_exists(&self, kind: NodeClassKind, name: &str) -> kube::Result<bool> {
        let found = match kind {
            NodeClassKind::Aks => Api::<AKSNodeClass>::all(self.client.clone())
                .get_opt(name)
                .await?
                .is_some(),
            NodeClassKind::Ec2 => Api::<EC2NodeClass>::all(self.client.clone())
                .get_opt(name)
                .await?
                .is_some(),
        };
        Ok(found)
    }

    async fn create_node_class(&self, class: &NodeClassManifest) -> kube::Result<()> {
        let pp = PostParams::default();
        match class {
            NodeClassManifest::Aks(class) => {
                Api::<AKSNodeClass>::all(self.client.clone())
                    .create(&pp, class)
                    .await?;
            }
            NodeClassManifest::Ec2(class) => {
                Api::<EC2NodeClass>::all(self.client.clone())
                    .create(&pp, class)
                    .await?;
            }
        }
        Ok(())
    }

    async fn list_nodes(&self, selector: &LabelSet) -> kube::Result<Vec<Node>> {
        Ok(Api::<Node>::all(self.client.clone())
            .list(&list_params(selector))
            .await?
            .items)
    }
}
