//! snapmover - snapshot namespaces with Velero, then move the snapshots out
//! in bounded batches
//!
//! A run creates one Velero Backup, waits for it and for every
//! VolumeSnapshotContent it produced to be ready, then creates
//! VolumeSnapshotBackup transfer jobs a window at a time, waiting for each
//! window to drain before starting the next. Progress is observed by polling
//! only.
//!
//! # Modules
//!
//! - [`poll`] - bounded fixed-interval condition poller
//! - [`readiness`] - ready/ongoing classification of correlated resources
//! - [`batch`] - windowing and per-window job creation
//! - [`orchestrator`] - the phase sequence of a run
//! - [`cluster`] - the Kubernetes calls a run makes
//! - [`context`] - run identity and correlation labels
//! - [`request`] - builders for the Backup and transfer jobs
//! - [`cli`] - command line surface

#![deny(missing_docs)]

pub mod batch;
pub mod cli;
pub mod cluster;
pub mod context;
pub mod error;
pub mod orchestrator;
pub mod poll;
pub mod readiness;
pub mod request;

pub use cli::Cli;
pub use error::{Error, Result};
