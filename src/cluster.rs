//! Cluster access used by the orchestrator
//!
//! The orchestrator only ever creates, gets and lists. Keeping those calls
//! behind [`ClusterClient`] lets tests drive a whole run against scripted
//! cluster state.

use async_trait::async_trait;
use kube::api::{Api, ListParams, PostParams};
use kube::{Client, ResourceExt};
use snapmover_common::crd::{Backup, VolumeSnapshotBackup, VolumeSnapshotContent};
use snapmover_common::Error;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

/// Trait abstracting the Kubernetes calls a run makes
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Create the top-level Backup in its own namespace
    async fn create_backup(&self, backup: &Backup) -> Result<Backup, Error>;

    /// Fetch a Backup by namespace and name
    async fn get_backup(&self, namespace: &str, name: &str) -> Result<Backup, Error>;

    /// List VolumeSnapshotContents matching a label selector
    async fn list_snapshot_contents(
        &self,
        selector: &str,
    ) -> Result<Vec<VolumeSnapshotContent>, Error>;

    /// Create a transfer job in its own namespace
    ///
    /// Returns the created object, whose name the server may have generated.
    async fn create_snapshot_backup(
        &self,
        job: &VolumeSnapshotBackup,
    ) -> Result<VolumeSnapshotBackup, Error>;

    /// List transfer jobs across all namespaces matching a label selector
    async fn list_snapshot_backups(
        &self,
        selector: &str,
    ) -> Result<Vec<VolumeSnapshotBackup>, Error>;
}

/// Real Kubernetes client implementation
pub struct KubeClusterClient {
    client: Client,
}

impl KubeClusterClient {
    /// Create a new KubeClusterClient wrapping the given kube Client
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn namespace_of<K: ResourceExt>(resource: &K, kind: &str) -> Result<String, Error> {
    resource.namespace().ok_or_else(|| {
        Error::validation_for_field("metadata.namespace", format!("{} has no namespace", kind))
    })
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn create_backup(&self, backup: &Backup) -> Result<Backup, Error> {
        let namespace = namespace_of(backup, "Backup")?;
        let api: Api<Backup> = Api::namespaced(self.client.clone(), &namespace);
        api.create(&PostParams::default(), backup)
            .await
            .map_err(|e| Error::from_kube("Backup", e))
    }

    async fn get_backup(&self, namespace: &str, name: &str) -> Result<Backup, Error> {
        let api: Api<Backup> = Api::namespaced(self.client.clone(), namespace);
        api.get(name)
            .await
            .map_err(|e| Error::from_kube("Backup", e))
    }

    async fn list_snapshot_contents(
        &self,
        selector: &str,
    ) -> Result<Vec<VolumeSnapshotContent>, Error> {
        let api: Api<VolumeSnapshotContent> = Api::all(self.client.clone());
        let list = api
            .list(&ListParams::default().labels(selector))
            .await
            .map_err(|e| Error::from_kube("VolumeSnapshotContent", e))?;
        debug!(selector, count = list.items.len(), "Listed volumesnapshotcontents");
        Ok(list.items)
    }

    async fn create_snapshot_backup(
        &self,
        job: &VolumeSnapshotBackup,
    ) -> Result<VolumeSnapshotBackup, Error> {
        let namespace = namespace_of(job, "VolumeSnapshotBackup")?;
        let api: Api<VolumeSnapshotBackup> = Api::namespaced(self.client.clone(), &namespace);
        api.create(&PostParams::default(), job)
            .await
            .map_err(|e| Error::from_kube("VolumeSnapshotBackup", e))
    }

    async fn list_snapshot_backups(
        &self,
        selector: &str,
    ) -> Result<Vec<VolumeSnapshotBackup>, Error> {
        let api: Api<VolumeSnapshotBackup> = Api::all(self.client.clone());
        let list = api
            .list(&ListParams::default().labels(selector))
            .await
            .map_err(|e| Error::from_kube("VolumeSnapshotBackup", e))?;
        debug!(selector, count = list.items.len(), "Listed volumesnapshotbackups");
        Ok(list.items)
    }
}
