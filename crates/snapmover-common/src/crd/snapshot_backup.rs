//! Data mover VolumeSnapshotBackup
//!
//! One transfer job per VolumeSnapshotContent. The data mover copies the
//! snapshot to the restic repository named by the secret and reports
//! progress on `status.phase`.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::ResourceRef;

/// Phases meaning the transfer finished successfully
///
/// The data mover has reported success under two names over its history;
/// both are accepted.
pub const COMPLETED_PHASES: &[&str] = &["Completed", "SnapMoverVolSyncPhaseCompleted"];

/// Reference to an object in the same namespace
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct LocalObjectRef {
    /// Object name
    pub name: String,
}

/// VolumeSnapshotBackup specification
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "datamover.oadp.openshift.io",
    version = "v1alpha1",
    kind = "VolumeSnapshotBackup",
    plural = "volumesnapshotbackups",
    shortname = "vsb",
    namespaced,
    status = "VolumeSnapshotBackupStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct VolumeSnapshotBackupSpec {
    /// Content holding the snapshot to move
    pub volume_snapshot_content: ResourceRef,

    /// Namespace where the data mover operator runs
    pub protected_namespace: String,

    /// Secret with the restic repository credentials
    pub restic_secret_ref: LocalObjectRef,
}

/// VolumeSnapshotBackup status
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VolumeSnapshotBackupStatus {
    /// Current phase
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,

    /// Restic repository the data landed in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restic_repository: Option<String>,
}

impl VolumeSnapshotBackup {
    /// Phase reported by the data mover, if any
    pub fn phase(&self) -> Option<&str> {
        self.status.as_ref().and_then(|s| s.phase.as_deref())
    }

    /// Whether the transfer reached a successful terminal phase
    pub fn is_completed(&self) -> bool {
        self.phase().is_some_and(|p| COMPLETED_PHASES.contains(&p))
    }
}
