//! CSI VolumeSnapshotContent
//!
//! Cluster-scoped snapshot artifact, one per captured volume. Velero labels
//! each one with the owning backup name as they appear.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Reference to a namespaced object
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRef {
    /// Object name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Object namespace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl ResourceRef {
    /// Reference an object by name only
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            namespace: None,
        }
    }
}

/// VolumeSnapshotContent specification
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "snapshot.storage.k8s.io",
    version = "v1",
    kind = "VolumeSnapshotContent",
    plural = "volumesnapshotcontents",
    status = "VolumeSnapshotContentStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct VolumeSnapshotContentSpec {
    /// CSI driver that produced the snapshot
    #[serde(default)]
    pub driver: String,

    /// Retain or Delete
    #[serde(default)]
    pub deletion_policy: String,

    /// The namespaced VolumeSnapshot bound to this content
    #[serde(default)]
    pub volume_snapshot_ref: ResourceRef,

    /// Snapshot class used to cut the snapshot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_snapshot_class_name: Option<String>,
}

/// Error reported by the snapshot controller
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VolumeSnapshotError {
    /// Error message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// VolumeSnapshotContent status
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VolumeSnapshotContentStatus {
    /// Whether the snapshot can be used to restore a volume
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ready_to_use: Option<bool>,

    /// Storage-system handle of the snapshot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_handle: Option<String>,

    /// Size of the restored volume in bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restore_size: Option<i64>,

    /// Last error hit while taking the snapshot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<VolumeSnapshotError>,
}

impl VolumeSnapshotContent {
    /// A content is usable once it has a handle and reports readyToUse
    pub fn is_ready_to_use(&self) -> bool {
        self.status.as_ref().is_some_and(|s| {
            s.ready_to_use == Some(true)
                && s.snapshot_handle.as_deref().is_some_and(|h| !h.is_empty())
        })
    }

    /// Namespace of the VolumeSnapshot bound to this content
    pub fn source_namespace(&self) -> Option<&str> {
        self.spec
            .volume_snapshot_ref
            .namespace
            .as_deref()
            .filter(|ns| !ns.is_empty())
    }
}
