//! Common types for snapmover: resource types, errors, and kube utilities

#![deny(missing_docs)]

pub mod crd;
pub mod error;
pub mod kube_utils;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Namespace holding the Velero Backup and the data mover configuration
pub const DEFAULT_PROTECTED_NAMESPACE: &str = "openshift-adp";

/// Label Velero stamps on every resource produced for a Backup
pub const LABEL_BACKUP_NAME: &str = "velero.io/backup-name";

/// Label correlating transfer jobs with the run that created them
pub const LABEL_RUN: &str = "perf-test";

/// Default restic secret handed to the data mover
pub const DEFAULT_RESTIC_SECRET: &str = "dpa-sample-1-volsync-restic";
