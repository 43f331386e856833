//! Per-run identity and correlation labels
//!
//! Each run generates one identifier. It names the Backup and is the label
//! value every downstream list filters on, so two runs in the same cluster
//! never see each other's resources.

use std::collections::BTreeMap;

use snapmover_common::kube_utils::label_selector;
use snapmover_common::{LABEL_BACKUP_NAME, LABEL_RUN};
use uuid::Uuid;

/// Identity of a single orchestration run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunContext {
    run_id: String,
    protected_namespace: String,
    content_label_key: String,
    job_label_key: String,
}

impl RunContext {
    /// Start a new run with a freshly generated identifier
    pub fn new(protected_namespace: impl Into<String>) -> Self {
        Self::with_run_id(Uuid::new_v4().to_string(), protected_namespace)
    }

    /// Build a context around an existing identifier
    pub fn with_run_id(run_id: impl Into<String>, protected_namespace: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            protected_namespace: protected_namespace.into(),
            content_label_key: LABEL_BACKUP_NAME.to_string(),
            job_label_key: LABEL_RUN.to_string(),
        }
    }

    /// Run identifier, also the Backup name
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Namespace holding the Backup and the data mover
    pub fn protected_namespace(&self) -> &str {
        &self.protected_namespace
    }

    /// Labels stamped on the Backup itself
    pub fn request_labels(&self) -> BTreeMap<String, String> {
        BTreeMap::from([(self.job_label_key.clone(), self.run_id.clone())])
    }

    /// Labels stamped on every transfer job
    pub fn job_labels(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (self.job_label_key.clone(), self.run_id.clone()),
            (self.content_label_key.clone(), self.run_id.clone()),
        ])
    }

    /// Selector matching the snapshot contents Velero produced for this run
    pub fn content_selector(&self) -> String {
        label_selector(&BTreeMap::from([(
            self.content_label_key.clone(),
            self.run_id.clone(),
        )]))
    }

    /// Selector matching the transfer jobs this run created
    pub fn job_selector(&self) -> String {
        label_selector(&BTreeMap::from([(
            self.job_label_key.clone(),
            self.run_id.clone(),
        )]))
    }
}
