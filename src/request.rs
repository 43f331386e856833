//! Builders for the resources a run creates

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::ResourceExt;
use snapmover_common::crd::{
    Backup, BackupSpec, LabelSelector, LocalObjectRef, ResourceRef, VolumeSnapshotBackup,
    VolumeSnapshotBackupSpec, VolumeSnapshotContent,
};

use crate::context::RunContext;
use crate::{Error, Result};

/// Prefix for server-generated transfer job names
pub const TRANSFER_JOB_PREFIX: &str = "vsb-";

/// What to snapshot: validated user input for the top-level Backup
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackupRequest {
    namespaces: Vec<String>,
    label_selector: Option<BTreeMap<String, String>>,
}

impl BackupRequest {
    /// Validate and build a request
    ///
    /// Blank namespace entries are dropped; at least one namespace must
    /// remain. An empty selector means no selector at all.
    pub fn new(
        namespaces: impl IntoIterator<Item = impl Into<String>>,
        label_selector: BTreeMap<String, String>,
    ) -> Result<Self> {
        let namespaces: Vec<String> = namespaces
            .into_iter()
            .map(Into::into)
            .map(|ns: String| ns.trim().to_string())
            .filter(|ns| !ns.is_empty())
            .collect();
        if namespaces.is_empty() {
            return Err(Error::config("missing namespaces"));
        }

        Ok(Self {
            namespaces,
            label_selector: (!label_selector.is_empty()).then_some(label_selector),
        })
    }

    /// Namespaces to snapshot, in the order given
    pub fn namespaces(&self) -> &[String] {
        &self.namespaces
    }

    /// Label criteria, if any
    pub fn label_selector(&self) -> Option<&BTreeMap<String, String>> {
        self.label_selector.as_ref()
    }

    /// Render the Velero Backup for this request under the run's identity
    pub fn to_backup(&self, ctx: &RunContext) -> Backup {
        Backup {
            metadata: ObjectMeta {
                name: Some(ctx.run_id().to_string()),
                namespace: Some(ctx.protected_namespace().to_string()),
                labels: Some(ctx.request_labels()),
                ..Default::default()
            },
            spec: BackupSpec {
                included_namespaces: self.namespaces.clone(),
                label_selector: self.label_selector.clone().map(|match_labels| LabelSelector {
                    match_labels,
                }),
                storage_location: None,
            },
            status: None,
        }
    }
}

/// Render the transfer job moving one snapshot content
///
/// The job lives in the namespace of the VolumeSnapshot bound to the
/// content. Contents without one cannot be moved.
pub fn transfer_job(
    ctx: &RunContext,
    restic_secret: &str,
    content: &VolumeSnapshotContent,
) -> snapmover_common::Result<VolumeSnapshotBackup> {
    let name = content.name_any();
    let namespace = content.source_namespace().ok_or_else(|| {
        snapmover_common::Error::validation_for_field(
            "spec.volumeSnapshotRef.namespace",
            format!("volumesnapshotcontent {} has no source namespace", name),
        )
    })?;

    Ok(VolumeSnapshotBackup {
        metadata: ObjectMeta {
            generate_name: Some(TRANSFER_JOB_PREFIX.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(ctx.job_labels()),
            ..Default::default()
        },
        spec: VolumeSnapshotBackupSpec {
            volume_snapshot_content: ResourceRef::named(name),
            protected_namespace: ctx.protected_namespace().to_string(),
            restic_secret_ref: LocalObjectRef {
                name: restic_secret.to_string(),
            },
        },
        status: None,
    })
}
