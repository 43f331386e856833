//! Run sequencing
//!
//! A run moves through a fixed sequence of phases:
//!
//! ```text
//! Start -> RequestSubmitted -> RequestPhaseCompleted -> ContentAllReady
//!       -> { DispatchWindow(i) -> WindowDrained(i) }* -> Done
//! ```
//!
//! Every wait uses the same [`PollSettings`]. A timeout or terminal error in
//! any wait ends the run; nothing is resumed, and a new run starts over with
//! a new identifier.

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use kube::ResourceExt;
use snapmover_common::crd::{BackupPhase, VolumeSnapshotContent};
use snapmover_common::{DEFAULT_PROTECTED_NAMESPACE, DEFAULT_RESTIC_SECRET};
use tokio::time::Instant;
use tracing::{info, warn};

use crate::batch::{BatchDispatcher, ItemFailurePolicy, DEFAULT_WINDOW_SIZE};
use crate::cluster::ClusterClient;
use crate::context::RunContext;
use crate::poll::{poll_until, PollSettings};
use crate::readiness::ReadinessReport;
use crate::request::{transfer_job, BackupRequest};
use crate::{Error, Result};

// =============================================================================
// Phases
// =============================================================================

/// Where a run is in its sequence
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunPhase {
    /// Nothing created yet
    Start,
    /// The Backup exists
    RequestSubmitted,
    /// Velero reports the Backup as Completed
    RequestPhaseCompleted,
    /// Every snapshot content of the run is ready to use
    ContentAllReady,
    /// Transfer jobs for window `i` are being created
    DispatchWindow(usize),
    /// Every transfer job of the run has completed after window `i`
    WindowDrained(usize),
    /// All windows drained
    Done,
}

impl RunPhase {
    /// Whether `next` directly follows this phase
    pub fn can_transition_to(self, next: RunPhase) -> bool {
        use RunPhase::*;
        match (self, next) {
            (Start, RequestSubmitted)
            | (RequestSubmitted, RequestPhaseCompleted)
            | (RequestPhaseCompleted, ContentAllReady)
            | (ContentAllReady, DispatchWindow(0))
            | (ContentAllReady, Done)
            | (WindowDrained(_), Done) => true,
            (DispatchWindow(i), WindowDrained(j)) => i == j,
            (WindowDrained(i), DispatchWindow(j)) => j == i + 1,
            _ => false,
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "Start"),
            Self::RequestSubmitted => write!(f, "RequestSubmitted"),
            Self::RequestPhaseCompleted => write!(f, "RequestPhaseCompleted"),
            Self::ContentAllReady => write!(f, "ContentAllReady"),
            Self::DispatchWindow(i) => write!(f, "DispatchWindow({})", i),
            Self::WindowDrained(i) => write!(f, "WindowDrained({})", i),
            Self::Done => write!(f, "Done"),
        }
    }
}

// =============================================================================
// Configuration and results
// =============================================================================

/// Knobs for a run, validated by the caller
#[derive(Clone, Debug)]
pub struct OrchestratorConfig {
    /// Interval and timeout for every wait step
    pub poll: PollSettings,
    /// Transfer jobs per window
    pub window_size: NonZeroUsize,
    /// Behaviour when a single transfer job cannot be created
    pub item_failure: ItemFailurePolicy,
    /// Restic secret handed to every transfer job
    pub restic_secret: String,
    /// Namespace for the Backup and the data mover
    pub protected_namespace: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            poll: PollSettings::default(),
            window_size: NonZeroUsize::new(DEFAULT_WINDOW_SIZE).unwrap_or(NonZeroUsize::MIN),
            item_failure: ItemFailurePolicy::default(),
            restic_secret: DEFAULT_RESTIC_SECRET.to_string(),
            protected_namespace: DEFAULT_PROTECTED_NAMESPACE.to_string(),
        }
    }
}

/// What a completed run did and how long it took
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunSummary {
    /// Run identifier and Backup name
    pub run_id: String,
    /// Ready contents that were batched
    pub contents: usize,
    /// Windows dispatched
    pub windows: usize,
    /// Names of the transfer jobs created
    pub jobs_created: Vec<String>,
    /// Contents whose transfer job could not be created
    pub jobs_failed: Vec<String>,
    /// Start to all contents ready
    pub snapshot_time: Duration,
    /// All contents ready to last window drained
    pub data_mover_time: Duration,
    /// Whole run
    pub total_time: Duration,
}

// =============================================================================
// Orchestrator
// =============================================================================

const WAIT_BACKUP: &str = "backup completion";
const WAIT_CONTENTS: &str = "volumesnapshotcontents to be ready";
const WAIT_JOBS: &str = "volumesnapshotbackups to complete";

/// Drives one run from Backup creation to the last drained window
pub struct Orchestrator {
    client: Arc<dyn ClusterClient>,
    config: OrchestratorConfig,
    phase: RunPhase,
}

impl Orchestrator {
    /// Create an orchestrator for a single run
    pub fn new(client: Arc<dyn ClusterClient>, config: OrchestratorConfig) -> Self {
        Self {
            client,
            config,
            phase: RunPhase::Start,
        }
    }

    /// Current phase
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Run with a freshly generated identifier
    pub async fn run(&mut self, request: &BackupRequest) -> Result<RunSummary> {
        let ctx = RunContext::new(self.config.protected_namespace.clone());
        self.run_with_context(&ctx, request).await
    }

    /// Run under an existing identity
    pub async fn run_with_context(
        &mut self,
        ctx: &RunContext,
        request: &BackupRequest,
    ) -> Result<RunSummary> {
        let started = Instant::now();

        self.submit_request(ctx, request).await?;
        self.advance(RunPhase::RequestSubmitted)?;

        self.wait_for_backup_completed(ctx).await?;
        self.advance(RunPhase::RequestPhaseCompleted)?;

        self.wait_for_contents_ready(ctx).await?;
        self.advance(RunPhase::ContentAllReady)?;

        let snapshot_time = started.elapsed();
        info!(elapsed = ?snapshot_time, "Snapshot time elapsed");

        let contents = self.ready_contents(ctx).await?;
        let dispatcher = BatchDispatcher::new(self.config.window_size, self.config.item_failure);
        let windows = dispatcher.windows(&contents);
        let mut jobs_created = Vec::new();
        let mut jobs_failed = Vec::new();

        for window in &windows {
            self.advance(RunPhase::DispatchWindow(window.index))?;

            let client = &self.client;
            let restic_secret = self.config.restic_secret.as_str();
            let report = dispatcher
                .dispatch(window, |content: VolumeSnapshotContent| async move {
                    let job = transfer_job(ctx, restic_secret, &content)?;
                    let created = client.create_snapshot_backup(&job).await?;
                    Ok(created.name_any())
                })
                .await?;

            if report.created.is_empty() {
                warn!(
                    window = window.index,
                    "No transfer jobs created in this window"
                );
            }
            jobs_created.extend(report.created);
            jobs_failed.extend(report.failed);

            self.wait_for_jobs_completed(ctx).await?;
            self.advance(RunPhase::WindowDrained(window.index))?;
        }

        self.advance(RunPhase::Done)?;

        let total_time = started.elapsed();
        let data_mover_time = total_time.saturating_sub(snapshot_time);
        info!(elapsed = ?data_mover_time, "Data mover time elapsed");
        info!(elapsed = ?total_time, "Total time");

        if !jobs_failed.is_empty() {
            warn!(
                count = jobs_failed.len(),
                contents = ?jobs_failed,
                "Some volumesnapshotcontents were never moved"
            );
        }

        Ok(RunSummary {
            run_id: ctx.run_id().to_string(),
            contents: contents.len(),
            windows: windows.len(),
            jobs_created,
            jobs_failed,
            snapshot_time,
            data_mover_time,
            total_time,
        })
    }

    fn advance(&mut self, next: RunPhase) -> Result<()> {
        if !self.phase.can_transition_to(next) {
            return Err(Error::InvalidTransition {
                from: self.phase.to_string(),
                to: next.to_string(),
            });
        }
        info!(from = %self.phase, to = %next, "Run phase transition");
        self.phase = next;
        Ok(())
    }

    async fn submit_request(&self, ctx: &RunContext, request: &BackupRequest) -> Result<()> {
        let backup = request.to_backup(ctx);
        self.client
            .create_backup(&backup)
            .await
            .map_err(|source| Error::RequestCreate {
                name: ctx.run_id().to_string(),
                source,
            })?;

        info!(
            backup = %ctx.run_id(),
            namespace = %ctx.protected_namespace(),
            namespaces = ?request.namespaces(),
            "Backup created"
        );
        info!(
            "To monitor snapshot contents run: kubectl get volumesnapshotcontents -l {}",
            ctx.content_selector()
        );
        Ok(())
    }

    async fn wait_for_backup_completed(&self, ctx: &RunContext) -> Result<()> {
        let client = &self.client;
        let namespace = ctx.protected_namespace();
        let name = ctx.run_id();

        poll_until(self.config.poll, || async move {
            let phase = client.get_backup(namespace, name).await?.phase();
            if phase == BackupPhase::Completed {
                return Ok(true);
            }
            if phase.is_terminal() {
                warn!(backup = %name, phase = %phase, "Backup ended without completing");
            } else {
                info!(backup = %name, phase = %phase, "Backup phase");
            }
            Ok(false)
        })
        .await
        .into_result(WAIT_BACKUP, self.config.poll.timeout)
    }

    async fn wait_for_contents_ready(&self, ctx: &RunContext) -> Result<()> {
        let client = &self.client;
        let selector = ctx.content_selector();
        let selector = selector.as_str();

        poll_until(self.config.poll, || async move {
            let contents = client.list_snapshot_contents(selector).await?;
            if contents.is_empty() {
                info!("Found no snapshots yet, waiting");
                return Ok(false);
            }
            let report = ReadinessReport::evaluate(&contents);
            info!(
                total = report.total(),
                ready = report.ready.len(),
                unready = report.ongoing.len(),
                "Volumesnapshotcontent readiness"
            );
            Ok(report.all_ready())
        })
        .await
        .into_result(WAIT_CONTENTS, self.config.poll.timeout)
    }

    async fn wait_for_jobs_completed(&self, ctx: &RunContext) -> Result<()> {
        let client = &self.client;
        let selector = ctx.job_selector();
        let selector = selector.as_str();

        poll_until(self.config.poll, || async move {
            let jobs = client.list_snapshot_backups(selector).await?;
            if jobs.is_empty() {
                info!("Found no transfer jobs yet, waiting");
                return Ok(false);
            }
            let report = ReadinessReport::evaluate(&jobs);
            info!(
                completed = report.ready.len(),
                running = report.ongoing.len(),
                "Volumesnapshotbackup progress"
            );
            Ok(report.all_ready())
        })
        .await
        .into_result(WAIT_JOBS, self.config.poll.timeout)
    }

    /// Snapshot of the ready contents that batching works from
    ///
    /// Anything that stopped being ready since the wait finished is left out
    /// so no job is created for an unusable snapshot.
    async fn ready_contents(&self, ctx: &RunContext) -> Result<Vec<VolumeSnapshotContent>> {
        let (ready, unready): (Vec<_>, Vec<_>) = self
            .client
            .list_snapshot_contents(&ctx.content_selector())
            .await?
            .into_iter()
            .partition(VolumeSnapshotContent::is_ready_to_use);

        if !unready.is_empty() {
            warn!(
                count = unready.len(),
                contents = ?unready.iter().map(ResourceExt::name_any).collect::<Vec<_>>(),
                "Skipping volumesnapshotcontents that are no longer ready"
            );
        }
        Ok(ready)
    }
}
