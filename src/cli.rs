//! Command line surface
//!
//! Flags are validated into a [`BackupRequest`] and an
//! [`OrchestratorConfig`] before any cluster connection is made, so bad
//! input aborts without touching the cluster.

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use snapmover_common::kube_utils::{create_client, parse_match_labels};
use snapmover_common::{DEFAULT_PROTECTED_NAMESPACE, DEFAULT_RESTIC_SECRET};
use tracing::info;

use crate::batch::ItemFailurePolicy;
use crate::cluster::KubeClusterClient;
use crate::orchestrator::{Orchestrator, OrchestratorConfig, RunSummary};
use crate::poll::PollSettings;
use crate::request::BackupRequest;
use crate::{Error, Result};

/// Snapshot namespaces with Velero and move the snapshots out in batches
#[derive(Parser, Debug)]
#[command(name = "snapmover")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Name of the restic secret for the data mover to use
    #[arg(long, default_value = DEFAULT_RESTIC_SECRET)]
    pub restic_secret: String,

    /// Comma separated list of namespaces to back up
    #[arg(long, value_delimiter = ',', required = true)]
    pub namespaces: Vec<String>,

    /// Number of volumesnapshotbackups to run per batch
    #[arg(long, default_value = "12", value_parser = parse_window_size)]
    pub concurrent: NonZeroUsize,

    /// Comma separated key=value labels used as criteria for the backup
    #[arg(long, default_value = "")]
    pub selectors: String,

    /// Path to kubeconfig file (kube defaults when unset)
    #[arg(long)]
    pub kubeconfig: Option<PathBuf>,

    /// Namespace holding the Backup and the data mover
    #[arg(long, default_value = DEFAULT_PROTECTED_NAMESPACE)]
    pub protected_namespace: String,

    /// Seconds between status checks in every wait step
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..))]
    pub poll_interval_secs: u64,

    /// Seconds each wait step may take before the run is aborted
    #[arg(long, default_value_t = 7200, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_secs: u64,

    /// What to do when a single volumesnapshotbackup cannot be created
    #[arg(long, default_value = "skip", value_parser = parse_item_failure_policy)]
    pub on_item_failure: ItemFailurePolicy,
}

fn parse_window_size(s: &str) -> std::result::Result<NonZeroUsize, String> {
    s.parse::<NonZeroUsize>()
        .map_err(|_| format!("invalid batch size '{}', must be a positive integer", s))
}

fn parse_item_failure_policy(s: &str) -> std::result::Result<ItemFailurePolicy, String> {
    match s.to_lowercase().as_str() {
        "skip" => Ok(ItemFailurePolicy::Skip),
        "abort" => Ok(ItemFailurePolicy::Abort),
        _ => Err(format!(
            "invalid item failure policy '{}', must be 'skip' or 'abort'",
            s
        )),
    }
}

impl Cli {
    /// Validated backup request from the namespace and selector flags
    pub fn request(&self) -> Result<BackupRequest> {
        let selector = parse_match_labels(&self.selectors)
            .map_err(|e| Error::config(e.to_string()))?;
        BackupRequest::new(self.namespaces.iter().cloned(), selector)
    }

    /// Orchestrator settings from the remaining flags
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            poll: PollSettings {
                interval: Duration::from_secs(self.poll_interval_secs),
                timeout: Duration::from_secs(self.timeout_secs),
            },
            window_size: self.concurrent,
            item_failure: self.on_item_failure,
            restic_secret: self.restic_secret.clone(),
            protected_namespace: self.protected_namespace.clone(),
        }
    }

    /// Validate input, connect, and drive one run to completion
    pub async fn run(self) -> Result<RunSummary> {
        let request = self.request()?;
        let config = self.orchestrator_config();

        let client = create_client(self.kubeconfig.as_deref()).await?;
        info!(
            namespaces = ?request.namespaces(),
            batch_size = config.window_size.get(),
            on_item_failure = %config.item_failure,
            "Starting run"
        );

        let mut orchestrator = Orchestrator::new(Arc::new(KubeClusterClient::new(client)), config);
        orchestrator.run(&request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> std::result::Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("snapmover").chain(args.iter().copied()))
    }

    #[test]
    fn defaults_cover_a_standard_install() {
        let cli = parse(&["--namespaces", "ns-a,ns-b"]).unwrap();
        assert_eq!(cli.restic_secret, "dpa-sample-1-volsync-restic");
        assert_eq!(cli.concurrent.get(), 12);
        assert_eq!(cli.protected_namespace, "openshift-adp");
        assert!(cli.kubeconfig.is_none());

        let config = cli.orchestrator_config();
        assert_eq!(config.poll, PollSettings::default());
        assert_eq!(config.item_failure, ItemFailurePolicy::Skip);
    }

    #[test]
    fn namespaces_flag_is_required() {
        assert!(parse(&[]).is_err());
    }

    #[test]
    fn empty_namespaces_are_rejected_before_connecting() {
        let cli = parse(&["--namespaces", ""]).unwrap();
        assert!(matches!(cli.request(), Err(Error::Config(_))));
    }

    #[test]
    fn request_splits_namespaces_and_selectors() {
        let cli = parse(&[
            "--namespaces",
            "ns-a,ns-b",
            "--selectors",
            "app=db,tier=backend",
        ])
        .unwrap();
        let request = cli.request().unwrap();
        assert_eq!(request.namespaces(), ["ns-a", "ns-b"]);
        let selector = request.label_selector().unwrap();
        assert_eq!(selector.get("tier"), Some(&"backend".to_string()));
    }

    #[test]
    fn no_selectors_means_no_label_selector() {
        let cli = parse(&["--namespaces", "ns-a"]).unwrap();
        assert!(cli.request().unwrap().label_selector().is_none());
    }

    #[test]
    fn malformed_selector_is_a_config_error() {
        let cli = parse(&["--namespaces", "ns-a", "--selectors", "app"]).unwrap();
        assert!(matches!(cli.request(), Err(Error::Config(_))));
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        assert!(parse(&["--namespaces", "ns-a", "--concurrent", "0"]).is_err());
        assert!(parse(&["--namespaces", "ns-a", "--concurrent", "-1"]).is_err());
    }

    #[test]
    fn poll_settings_and_policy_flags() {
        let cli = parse(&[
            "--namespaces",
            "ns-a",
            "--poll-interval-secs",
            "1",
            "--timeout-secs",
            "30",
            "--on-item-failure",
            "Abort",
            "--concurrent",
            "3",
        ])
        .unwrap();
        let config = cli.orchestrator_config();
        assert_eq!(config.poll.interval, Duration::from_secs(1));
        assert_eq!(config.poll.timeout, Duration::from_secs(30));
        assert_eq!(config.item_failure, ItemFailurePolicy::Abort);
        assert_eq!(config.window_size.get(), 3);

        assert!(parse(&["--namespaces", "ns-a", "--on-item-failure", "retry"]).is_err());
        assert!(parse(&["--namespaces", "ns-a", "--poll-interval-secs", "0"]).is_err());
    }
}
