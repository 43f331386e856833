//! Readiness classification for a run's correlated resources
//!
//! A wait step lists everything carrying the run's label and asks whether
//! the whole set is done. An empty set is never done: a run that has not
//! produced anything yet looks the same as one that never will.

use kube::ResourceExt;
use snapmover_common::crd::{VolumeSnapshotBackup, VolumeSnapshotContent};

/// A resource that can be judged ready or still in flight
pub trait Readiness {
    /// Name used in progress logs
    fn resource_name(&self) -> String;

    /// Whether this resource has reached its successful end state
    fn is_ready(&self) -> bool;
}

impl Readiness for VolumeSnapshotContent {
    fn resource_name(&self) -> String {
        self.name_any()
    }

    fn is_ready(&self) -> bool {
        self.is_ready_to_use()
    }
}

impl Readiness for VolumeSnapshotBackup {
    fn resource_name(&self) -> String {
        self.name_any()
    }

    fn is_ready(&self) -> bool {
        self.is_completed()
    }
}

/// Ready/ongoing split of one observed collection
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReadinessReport {
    /// Names of resources in their successful end state
    pub ready: Vec<String>,
    /// Names of everything else, including failed resources
    pub ongoing: Vec<String>,
}

impl ReadinessReport {
    /// Classify a collection. Pure function of its input.
    pub fn evaluate<T: Readiness>(items: &[T]) -> Self {
        let mut report = Self::default();
        for item in items {
            if item.is_ready() {
                report.ready.push(item.resource_name());
            } else {
                report.ongoing.push(item.resource_name());
            }
        }
        report
    }

    /// Total number of resources observed
    pub fn total(&self) -> usize {
        self.ready.len() + self.ongoing.len()
    }

    /// Whether nothing was observed
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Done only when something was observed and nothing is still in flight
    pub fn all_ready(&self) -> bool {
        !self.is_empty() && self.ongoing.is_empty()
    }
}
