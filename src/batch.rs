//! Windowed dispatch of transfer jobs
//!
//! The ready contents are cut into contiguous windows of a fixed size once,
//! up front. Each window creates one job per content; the orchestrator then
//! waits for the whole run to drain before the next window starts.

use std::fmt;
use std::future::Future;
use std::num::NonZeroUsize;

use kube::ResourceExt;
use tracing::{error, info};

use crate::{Error, Result};

/// Default number of transfer jobs in flight per window
pub const DEFAULT_WINDOW_SIZE: usize = 12;

/// What to do when creating one job in a window fails
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ItemFailurePolicy {
    /// Log the failure and carry on; the content is never moved
    #[default]
    Skip,
    /// Stop the run on the first failure
    Abort,
}

impl fmt::Display for ItemFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skip => write!(f, "skip"),
            Self::Abort => write!(f, "abort"),
        }
    }
}

/// One contiguous slice of the work list
#[derive(Debug, PartialEq, Eq)]
pub struct Window<'a, T> {
    /// Zero-based window number
    pub index: usize,
    /// Position of the first item in the full list
    pub offset: usize,
    /// Items in this window
    pub items: &'a [T],
}

/// Cut `items` into windows of `size`, the last one possibly shorter
pub fn windows<T>(items: &[T], size: NonZeroUsize) -> Vec<Window<'_, T>> {
    let size = size.get();
    let mut out = Vec::with_capacity(items.len().div_ceil(size));
    let mut offset = 0;
    while offset < items.len() {
        let end = (offset + size).min(items.len());
        out.push(Window {
            index: out.len(),
            offset,
            items: &items[offset..end],
        });
        offset = end;
    }
    out
}

/// Outcome of dispatching one window
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WindowReport {
    /// Names of the jobs created
    pub created: Vec<String>,
    /// Names of the contents whose job could not be created
    pub failed: Vec<String>,
}

/// Creates transfer jobs window by window
#[derive(Clone, Copy, Debug)]
pub struct BatchDispatcher {
    window_size: NonZeroUsize,
    policy: ItemFailurePolicy,
}

impl BatchDispatcher {
    /// Create a dispatcher with the given window size and failure policy
    pub fn new(window_size: NonZeroUsize, policy: ItemFailurePolicy) -> Self {
        Self {
            window_size,
            policy,
        }
    }

    /// Cut `items` into this dispatcher's windows
    pub fn windows<'a, T>(&self, items: &'a [T]) -> Vec<Window<'a, T>> {
        windows(items, self.window_size)
    }

    /// Attempt `create_one` for every item in the window, in order
    ///
    /// `create_one` returns the name of the created job. Under
    /// [`ItemFailurePolicy::Skip`] a failure is logged and the item is left
    /// out of the report's `created` list; under [`ItemFailurePolicy::Abort`]
    /// the first failure is returned.
    pub async fn dispatch<T, F, Fut>(
        &self,
        window: &Window<'_, T>,
        mut create_one: F,
    ) -> Result<WindowReport>
    where
        T: ResourceExt + Clone,
        F: FnMut(T) -> Fut,
        Fut: Future<Output = snapmover_common::Result<String>>,
    {
        info!(
            window = window.index,
            items = window.items.len(),
            "Processing volumesnapshotcontents"
        );

        let mut report = WindowReport::default();
        for item in window.items {
            let key = item.name_any();
            match create_one(item.clone()).await {
                Ok(job) => {
                    info!(content = %key, job = %job, "Created transfer job");
                    report.created.push(job);
                }
                Err(e) => {
                    error!(content = %key, error = %e, "Failed to create transfer job");
                    if self.policy == ItemFailurePolicy::Abort {
                        return Err(Error::ItemCreate {
                            item: key,
                            source: e,
                        });
                    }
                    report.failed.push(key);
                }
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use snapmover_common::crd::{VolumeSnapshotContent, VolumeSnapshotContentSpec};
    use std::sync::{Arc, Mutex};

    fn size(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    fn contents(n: usize) -> Vec<VolumeSnapshotContent> {
        (0..n)
            .map(|i| {
                VolumeSnapshotContent::new(
                    &format!("snapcontent-{}", i),
                    VolumeSnapshotContentSpec::default(),
                )
            })
            .collect()
    }

    #[rstest]
    #[case::exact_multiple(12, 4, vec![4, 4, 4])]
    #[case::short_tail(5, 2, vec![2, 2, 1])]
    #[case::single_window(3, 12, vec![3])]
    #[case::window_of_one(3, 1, vec![1, 1, 1])]
    #[case::equal_length(12, 12, vec![12])]
    #[case::empty(0, 12, vec![])]
    fn windows_partition_every_index_once(
        #[case] len: usize,
        #[case] window: usize,
        #[case] sizes: Vec<usize>,
    ) {
        let items: Vec<usize> = (0..len).collect();
        let ws = windows(&items, size(window));

        assert_eq!(ws.len(), len.div_ceil(window));
        assert_eq!(ws.iter().map(|w| w.items.len()).collect::<Vec<_>>(), sizes);

        let flattened: Vec<usize> = ws.iter().flat_map(|w| w.items.iter().copied()).collect();
        assert_eq!(flattened, items);

        for (i, w) in ws.iter().enumerate() {
            assert_eq!(w.index, i);
            assert_eq!(w.offset, i * window);
        }
    }

    #[tokio::test]
    async fn dispatch_creates_one_job_per_item_in_order() {
        let items = contents(3);
        let dispatcher = BatchDispatcher::new(size(3), ItemFailurePolicy::Skip);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let ws = dispatcher.windows(&items);
        let report = dispatcher
            .dispatch(&ws[0], |vsc: VolumeSnapshotContent| {
                let seen = seen.clone();
                async move {
                    let name = vsc.name_any();
                    seen.lock().unwrap().push(name.clone());
                    Ok(format!("vsb-{}", name))
                }
            })
            .await
            .unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["snapcontent-0", "snapcontent-1", "snapcontent-2"]
        );
        assert_eq!(report.created.len(), 3);
        assert!(report.failed.is_empty());
    }

    /// A failure in the middle of a window shrinks the window instead of
    /// ending it.
    #[tokio::test]
    async fn skip_policy_continues_past_failed_item() {
        let items = contents(3);
        let dispatcher = BatchDispatcher::new(size(3), ItemFailurePolicy::Skip);

        let ws = dispatcher.windows(&items);
        let report = dispatcher
            .dispatch(&ws[0], |vsc: VolumeSnapshotContent| async move {
                let name = vsc.name_any();
                if name == "snapcontent-1" {
                    Err(snapmover_common::Error::validation("admission denied"))
                } else {
                    Ok(format!("vsb-{}", name))
                }
            })
            .await
            .unwrap();

        assert_eq!(report.created, vec!["vsb-snapcontent-0", "vsb-snapcontent-2"]);
        assert_eq!(report.failed, vec!["snapcontent-1"]);
    }

    #[tokio::test]
    async fn abort_policy_stops_at_first_failure() {
        let items = contents(3);
        let dispatcher = BatchDispatcher::new(size(3), ItemFailurePolicy::Abort);
        let attempts = Arc::new(Mutex::new(0));

        let ws = dispatcher.windows(&items);
        let err = dispatcher
            .dispatch(&ws[0], |vsc: VolumeSnapshotContent| {
                let attempts = attempts.clone();
                async move {
                    *attempts.lock().unwrap() += 1;
                    if vsc.name_any() == "snapcontent-1" {
                        Err(snapmover_common::Error::validation("admission denied"))
                    } else {
                        Ok("vsb".to_string())
                    }
                }
            })
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ItemCreate { ref item, .. } if item == "snapcontent-1"));
        assert_eq!(*attempts.lock().unwrap(), 2);
    }

    #[test]
    fn policy_display() {
        assert_eq!(ItemFailurePolicy::default().to_string(), "skip");
        assert_eq!(ItemFailurePolicy::Abort.to_string(), "abort");
    }
}
