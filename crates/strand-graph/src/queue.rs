use crate::error::RelayError;
use dashmap::DashMap;
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use strand_llm::ReplyError;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error};

type BoxTask = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

struct Job {
    task: BoxTask,
    done: oneshot::Sender<anyhow::Result<()>>,
}

/// Completion of one queued task
pub struct TaskHandle {
    dest_id: String,
    rx: oneshot::Receiver<anyhow::Result<()>>,
}

impl TaskHandle {
    pub fn dest_id(&self) -> &str {
        &self.dest_id
    }

    /// Wait for the task; its failure is reported here as well as logged
    pub async fn join(self) -> anyhow::Result<()> {
        match self.rx.await {
            Ok(result) => result,
            Err(_) => Err(RelayError::TaskDropped(self.dest_id).into()),
        }
    }
}

/// Whether an error is a deliberate cancellation rather than a failure
pub fn is_abort(error: &anyhow::Error) -> bool {
    error
        .downcast_ref::<ReplyError>()
        .is_some_and(ReplyError::is_aborted)
}

/// Sending side of one destination worker
struct Worker {
    sender: mpsc::UnboundedSender<Job>,
    /// Flips to true once the worker has drained its queue and exited
    finished: watch::Receiver<bool>,
}

/// One FIFO worker per destination id
///
/// Tasks for the same destination run one at a time in enqueue order.
/// Different destinations proceed independently. A worker started after an
/// eviction waits for the evicted worker to drain first.
#[derive(Default)]
pub struct DestinationQueues {
    workers: DashMap<String, Worker>,
    /// Evicted workers that may still be running queued tasks
    retired: DashMap<String, watch::Receiver<bool>>,
}

impl DestinationQueues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a task to `dest_id`'s queue without waiting for it
    ///
    /// Must be called from within a Tokio runtime.
    pub fn enqueue<F>(&self, dest_id: &str, task: F) -> TaskHandle
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let (done, rx) = oneshot::channel();
        let mut job = Job {
            task: Box::pin(task),
            done,
        };

        // A closed sender means the worker exited; replace it once
        for _ in 0..2 {
            let sender = self
                .workers
                .entry(dest_id.to_string())
                .or_insert_with(|| {
                    let predecessor = self.retired.remove(dest_id).map(|(_, finished)| finished);
                    spawn_worker(dest_id.to_string(), predecessor)
                })
                .sender
                .clone();
            match sender.send(job) {
                Ok(()) => break,
                Err(mpsc::error::SendError(returned)) => {
                    self.workers
                        .remove_if(dest_id, |_, current| current.sender.same_channel(&sender));
                    job = returned;
                }
            }
        }

        TaskHandle {
            dest_id: dest_id.to_string(),
            rx,
        }
    }

    /// Forget a destination; tasks already queued still run, and a later
    /// enqueue for the same id waits for them
    pub fn evict(&self, dest_id: &str) -> bool {
        match self.workers.remove(dest_id) {
            Some((_, worker)) => {
                if !*worker.finished.borrow() {
                    self.retired.insert(dest_id.to_string(), worker.finished);
                }
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, dest_id: &str) -> bool {
        self.workers.contains_key(dest_id)
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}

fn spawn_worker(dest_id: String, predecessor: Option<watch::Receiver<bool>>) -> Worker {
    let (sender, rx) = mpsc::unbounded_channel();
    let (finished_tx, finished) = watch::channel(false);
    tokio::spawn(run_worker(dest_id, rx, predecessor, finished_tx));
    Worker { sender, finished }
}

async fn run_worker(
    dest_id: String,
    mut rx: mpsc::UnboundedReceiver<Job>,
    predecessor: Option<watch::Receiver<bool>>,
    finished: watch::Sender<bool>,
) {
    if let Some(mut previous) = predecessor {
        debug!(dest = %dest_id, "waiting for evicted worker to drain");
        // A dropped sender also means the previous worker is gone
        let _ = previous.wait_for(|done| *done).await;
    }

    debug!(dest = %dest_id, "queue worker started");
    while let Some(job) = rx.recv().await {
        let result = match AssertUnwindSafe(job.task).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => Err(RelayError::TaskPanicked(panic_message(panic.as_ref())).into()),
        };

        if let Err(e) = &result {
            if is_abort(e) {
                debug!(dest = %dest_id, "delivery aborted");
            } else {
                error!(dest = %dest_id, error = %e, "delivery failed");
            }
        }
        let _ = job.done.send(result);
    }
    let _ = finished.send(true);
    debug!(dest = %dest_id, "queue worker stopped");
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
