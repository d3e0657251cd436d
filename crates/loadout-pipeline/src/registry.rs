//! Process-wide single-flight guard for logical operations.
//!
//! The registry owns every running task handle; callers hold only
//! [`OperationKey`]s. One key maps to at most one live task, so starting a
//! second download-install cycle while one runs fails with `AlreadyRunning`
//! regardless of which job either cycle belongs to.

use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};
use std::future::Future;
use std::sync::Mutex;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{PipelineError, PipelineResult};

/// Identity of a logical operation guarded by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKey {
    /// Download a package without installing it.
    Download,
    /// Full download-then-install cycle.
    DownloadInstall,
    /// Install a locally available package.
    Install,
    /// Refresh the attached-device list.
    LoadDevices,
}

impl OperationKey {
    /// Stable string form used in logs and diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Download => "download",
            Self::DownloadInstall => "download_install",
            Self::Install => "install",
            Self::LoadDevices => "load_devices",
        }
    }
}

impl Display for OperationKey {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

struct TaskHandle {
    join: JoinHandle<()>,
    cancel: CancellationToken,
}

impl TaskHandle {
    /// A handle blocks its key while it is neither completed nor cancelled.
    fn is_active(&self) -> bool {
        !self.join.is_finished() && !self.cancel.is_cancelled()
    }
}

/// At-most-one-concurrent-operation guard, keyed by [`OperationKey`].
#[derive(Default)]
pub struct TaskRegistry {
    tasks: Mutex<HashMap<OperationKey, TaskHandle>>,
}

impl TaskRegistry {
    /// Construct an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `operation` under `key` unless an active task already holds it.
    ///
    /// The operation receives a cancellation token it may observe
    /// cooperatively; the registry never aborts a task forcibly.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::AlreadyRunning`] when an active task holds
    /// the key. This is a signal to notify the user or ignore, never to
    /// retry automatically.
    ///
    /// # Panics
    ///
    /// Panics if the registry mutex has been poisoned.
    pub fn start_if_idle<F, Fut>(&self, key: OperationKey, operation: F) -> PipelineResult<()>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks.lock().expect("task registry mutex poisoned");
        if let Some(existing) = tasks.get(&key)
            && existing.is_active()
        {
            return Err(PipelineError::AlreadyRunning { key });
        }

        let cancel = CancellationToken::new();
        let join = tokio::spawn(operation(cancel.clone()));
        tasks.insert(key, TaskHandle { join, cancel });
        debug!(key = %key, "operation registered");
        Ok(())
    }

    /// Whether an active (neither completed nor cancelled) task holds `key`.
    ///
    /// # Panics
    ///
    /// Panics if the registry mutex has been poisoned.
    #[must_use]
    pub fn is_running(&self, key: OperationKey) -> bool {
        let tasks = self.tasks.lock().expect("task registry mutex poisoned");
        tasks.get(&key).is_some_and(TaskHandle::is_active)
    }

    /// Request cooperative cancellation of the task under `key`.
    ///
    /// Returns whether a task was present to receive the request.
    ///
    /// # Panics
    ///
    /// Panics if the registry mutex has been poisoned.
    pub fn request_cancel(&self, key: OperationKey) -> bool {
        let tasks = self.tasks.lock().expect("task registry mutex poisoned");
        tasks.get(&key).is_some_and(|handle| {
            handle.cancel.cancel();
            true
        })
    }

    /// Wait for the task under `key` to finish and release the key.
    ///
    /// # Panics
    ///
    /// Panics if the registry mutex has been poisoned.
    pub async fn join(&self, key: OperationKey) {
        let handle = {
            let mut tasks = self.tasks.lock().expect("task registry mutex poisoned");
            tasks.remove(&key)
        };
        if let Some(handle) = handle {
            let _ = handle.join.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::oneshot;
    use tokio::time::sleep;

    #[tokio::test]
    async fn second_start_under_the_same_key_is_rejected() {
        let registry = Arc::new(TaskRegistry::new());
        let (release, gate) = oneshot::channel::<()>();

        registry
            .start_if_idle(OperationKey::DownloadInstall, move |_cancel| async move {
                let _ = gate.await;
            })
            .expect("first start succeeds");

        let err = registry
            .start_if_idle(OperationKey::DownloadInstall, |_cancel| async {})
            .expect_err("second start must fail");
        assert!(matches!(
            err,
            PipelineError::AlreadyRunning {
                key: OperationKey::DownloadInstall
            }
        ));
        assert!(registry.is_running(OperationKey::DownloadInstall));

        release.send(()).expect("task still waiting");
        registry.join(OperationKey::DownloadInstall).await;
        assert!(!registry.is_running(OperationKey::DownloadInstall));
    }

    #[tokio::test]
    async fn distinct_keys_run_concurrently() {
        let registry = TaskRegistry::new();
        let (release_a, gate_a) = oneshot::channel::<()>();
        let (release_b, gate_b) = oneshot::channel::<()>();

        registry
            .start_if_idle(OperationKey::Download, move |_cancel| async move {
                let _ = gate_a.await;
            })
            .expect("download starts");
        registry
            .start_if_idle(OperationKey::LoadDevices, move |_cancel| async move {
                let _ = gate_b.await;
            })
            .expect("device refresh starts alongside");

        assert!(registry.is_running(OperationKey::Download));
        assert!(registry.is_running(OperationKey::LoadDevices));

        release_a.send(()).expect("task waiting");
        release_b.send(()).expect("task waiting");
        registry.join(OperationKey::Download).await;
        registry.join(OperationKey::LoadDevices).await;
    }

    #[tokio::test]
    async fn completed_task_releases_the_key() {
        let registry = TaskRegistry::new();
        registry
            .start_if_idle(OperationKey::Install, |_cancel| async {})
            .expect("start succeeds");
        registry.join(OperationKey::Install).await;

        registry
            .start_if_idle(OperationKey::Install, |_cancel| async {})
            .expect("key is reusable after completion");
        registry.join(OperationKey::Install).await;
    }

    #[tokio::test]
    async fn cancelled_task_stops_blocking_the_key() {
        let registry = TaskRegistry::new();
        registry
            .start_if_idle(OperationKey::Download, |cancel| async move {
                cancel.cancelled().await;
            })
            .expect("start succeeds");

        assert!(registry.is_running(OperationKey::Download));
        assert!(registry.request_cancel(OperationKey::Download));
        // A cancelled handle no longer counts as running even while draining.
        sleep(Duration::from_millis(10)).await;
        assert!(!registry.is_running(OperationKey::Download));
        registry.join(OperationKey::Download).await;
    }
}
