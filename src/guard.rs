//! Supervision of analyzer work that escapes the orchestrator's own error path.
//!
//! The orchestrator awaits each analyzer call inside [`Guard::supervise`], so a
//! panic in the analyzer becomes a recorded failure instead of tearing down the
//! process. Analyzers that start background work do it through
//! [`FailureSink::spawn`]; errors and panics from those tasks land in the same
//! channel. The guard never ends the run: it only collects failures for the
//! orchestrator to fold into the outcome.

use futures::FutureExt;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
/// A failure nobody else handled.
pub struct GuardFailure {
    pub origin: String,
    pub message: String,
}

impl fmt::Display for GuardFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.origin, self.message)
    }
}

impl std::error::Error for GuardFailure {}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}

type Handles = Arc<Mutex<Vec<JoinHandle<()>>>>;

#[derive(Clone)]
/// Cloneable handle analyzers use to surface unattributed failures.
pub struct FailureSink {
    tx: UnboundedSender<GuardFailure>,
    handles: Handles,
}

impl FailureSink {
    /// Record a failure observed outside any awaited call chain.
    pub fn report(&self, origin: impl Into<String>, error: impl fmt::Display) {
        let failure = GuardFailure {
            origin: origin.into(),
            message: error.to_string(),
        };
        warn!(origin = %failure.origin, "unhandled failure: {}", failure.message);
        if self.tx.send(failure).is_err() {
            debug!("guard already closed; failure dropped");
        }
    }

    /// Spawn a detached task whose error or panic is recorded as a failure.
    pub fn spawn<F, E>(&self, origin: impl Into<String>, fut: F)
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let origin = origin.into();
        let sink = self.clone();
        let handle = tokio::spawn(async move {
            match AssertUnwindSafe(fut).catch_unwind().await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => sink.report(origin, e),
                Err(payload) => sink.report(origin, panic_message(payload)),
            }
        });
        let mut hs = match self.handles.lock() {
            Ok(hs) => hs,
            Err(poisoned) => poisoned.into_inner(),
        };
        // Finished tasks have already sent their failure.
        hs.retain(|h| !h.is_finished());
        hs.push(handle);
    }
}

/// Owner of the failure channel for one run.
pub struct Guard {
    sink: FailureSink,
    rx: UnboundedReceiver<GuardFailure>,
}

impl Default for Guard {
    fn default() -> Self {
        Self::new()
    }
}

impl Guard {
    pub fn new() -> Self {
        let (tx, rx) = unbounded_channel();
        Self {
            sink: FailureSink {
                tx,
                handles: Arc::new(Mutex::new(Vec::new())),
            },
            rx,
        }
    }

    pub fn sink(&self) -> FailureSink {
        self.sink.clone()
    }

    /// Await `fut`, turning a panic into a [`GuardFailure`].
    pub async fn supervise<F, T>(&self, origin: &str, fut: F) -> Result<T, GuardFailure>
    where
        F: Future<Output = T>,
    {
        AssertUnwindSafe(fut)
            .catch_unwind()
            .await
            .map_err(|payload| GuardFailure {
                origin: origin.to_string(),
                message: panic_message(payload),
            })
    }

    /// Failures received so far, in arrival order.
    pub fn drain(&mut self) -> Vec<GuardFailure> {
        let mut out = Vec::new();
        while let Ok(f) = self.rx.try_recv() {
            out.push(f);
        }
        out
    }

    /// Wait for every spawned task to finish, then drain.
    ///
    /// Tasks may spawn further tasks, so this loops until no handle is left.
    pub async fn settle(&mut self) -> Vec<GuardFailure> {
        loop {
            let pending: Vec<JoinHandle<()>> = match self.sink.handles.lock() {
                Ok(mut hs) => std::mem::take(&mut *hs),
                Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
            };
            if pending.is_empty() {
                break;
            }
            debug!(tasks = pending.len(), "waiting for supervised tasks");
            for h in pending {
                // The task body already reports its own failures.
                if let Err(e) = h.await {
                    self.sink.report("supervised task", e);
                }
            }
        }
        self.drain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_supervise_passes_values_through() {
        let guard = Guard::new();
        let v = guard.supervise("ok", async { 7 }).await.unwrap();
        assert_eq!(v, 7);
    }

    #[tokio::test]
    async fn test_supervise_catches_panic() {
        let guard = Guard::new();
        let err = guard
            .supervise("boom", async {
                if true {
                    panic!("analyzer exploded");
                }
                1
            })
            .await
            .unwrap_err();
        assert_eq!(err.origin, "boom");
        assert!(err.message.contains("analyzer exploded"));
    }

    #[tokio::test]
    async fn test_report_and_drain() {
        let mut guard = Guard::new();
        guard.sink().report("late", "rejection after settle");
        let got = guard.drain();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].message, "rejection after settle");
        assert!(guard.drain().is_empty());
    }

    #[tokio::test]
    async fn test_settle_waits_for_spawned_tasks() {
        let mut guard = Guard::new();
        let sink = guard.sink();
        sink.spawn("bg-err", async {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            Err::<(), _>("late failure")
        });
        sink.spawn("bg-ok", async { Ok::<(), String>(()) });
        sink.spawn("bg-panic", async {
            if true {
                panic!("callback threw");
            }
            Ok::<(), String>(())
        });
        let mut got = guard.settle().await;
        got.sort_by(|a, b| a.origin.cmp(&b.origin));
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].origin, "bg-err");
        assert_eq!(got[1].origin, "bg-panic");
        assert!(got[1].message.contains("callback threw"));
    }

    #[tokio::test]
    async fn test_spawn_prunes_finished_handles() {
        let mut guard = Guard::new();
        let sink = guard.sink();
        for i in 0..5 {
            sink.spawn(format!("bg-{i}"), async { Err::<(), _>("early failure") });
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert_eq!(sink.handles.lock().unwrap().len(), 1);
        let got = guard.settle().await;
        assert_eq!(got.len(), 5);
        assert!(sink.handles.lock().unwrap().is_empty());
    }
}
