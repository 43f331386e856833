//! Typed views of the external resources snapmover reads and creates
//!
//! None of these CRDs are owned by snapmover. The structs cover the fields
//! the orchestration reads or sets and tolerate everything else the owning
//! controllers put on the objects.

mod backup;
mod snapshot_backup;
mod snapshot_content;

pub use backup::{Backup, BackupPhase, BackupSpec, BackupStatus, LabelSelector};
pub use snapshot_backup::{
    LocalObjectRef, VolumeSnapshotBackup, VolumeSnapshotBackupSpec, VolumeSnapshotBackupStatus,
    COMPLETED_PHASES,
};
pub use snapshot_content::{
    ResourceRef, VolumeSnapshotContent, VolumeSnapshotContentSpec, VolumeSnapshotContentStatus,
    VolumeSnapshotError,
};
