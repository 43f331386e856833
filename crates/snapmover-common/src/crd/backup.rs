//! Velero Backup
//!
//! The top-level request of a run. Velero turns it into one
//! VolumeSnapshotContent per captured volume, each labelled with
//! `velero.io/backup-name=<backup>`.

use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// =============================================================================
// Phase
// =============================================================================

/// Lifecycle phase reported by Velero on `status.phase`
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum BackupPhase {
    /// Accepted but not yet processed
    #[default]
    New,
    /// Rejected by Velero's validation
    FailedValidation,
    /// Resources and volumes are being captured
    InProgress,
    /// Waiting on asynchronous plugin operations
    WaitingForPluginOperations,
    /// Waiting on plugin operations after a partial failure
    WaitingForPluginOperationsPartiallyFailed,
    /// Uploading final metadata
    Finalizing,
    /// Uploading final metadata after a partial failure
    FinalizingPartiallyFailed,
    /// Finished successfully
    Completed,
    /// Finished with some items failing
    PartiallyFailed,
    /// Finished unsuccessfully
    Failed,
    /// Being deleted
    Deleting,
    /// Any phase this build does not know about (including the empty phase)
    #[serde(other)]
    Unknown,
}

impl BackupPhase {
    /// Whether Velero will not move this backup to another phase on its own
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::PartiallyFailed | Self::Failed | Self::FailedValidation
        )
    }
}

impl std::fmt::Display for BackupPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::New => "New",
            Self::FailedValidation => "FailedValidation",
            Self::InProgress => "InProgress",
            Self::WaitingForPluginOperations => "WaitingForPluginOperations",
            Self::WaitingForPluginOperationsPartiallyFailed => {
                "WaitingForPluginOperationsPartiallyFailed"
            }
            Self::Finalizing => "Finalizing",
            Self::FinalizingPartiallyFailed => "FinalizingPartiallyFailed",
            Self::Completed => "Completed",
            Self::PartiallyFailed => "PartiallyFailed",
            Self::Failed => "Failed",
            Self::Deleting => "Deleting",
            Self::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

// =============================================================================
// CRD
// =============================================================================

/// Label selector for backup filtering
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LabelSelector {
    /// Match labels
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub match_labels: BTreeMap<String, String>,
}

/// Velero Backup specification
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "velero.io",
    version = "v1",
    kind = "Backup",
    plural = "backups",
    namespaced,
    status = "BackupStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct BackupSpec {
    /// Namespaces whose workloads are captured
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub included_namespaces: Vec<String>,

    /// Only capture resources matching these labels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_selector: Option<LabelSelector>,

    /// Storage location name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_location: Option<String>,
}

/// Status Velero reports on a Backup
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BackupStatus {
    /// Current phase
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<BackupPhase>,

    /// Number of errors Velero hit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<u32>,

    /// Number of warnings Velero raised
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warnings: Option<u32>,
}

impl Backup {
    /// Phase reported by Velero, `New` until a status exists
    pub fn phase(&self) -> BackupPhase {
        self.status
            .as_ref()
            .and_then(|s| s.phase.clone())
            .unwrap_or_default()
    }
}
