//! Bounded worker pool.
//!
//! A fixed set of worker tasks drains a shared unbounded queue. Submission
//! never blocks; each submitted task yields a [`TaskHandle`] the caller can
//! await for the task's result. A task that errors (or panics) surfaces
//! that failure to its own waiter only — the worker survives and keeps
//! draining.
//!
//! There is no backpressure on the queue and no preemption of running
//! tasks; cancellation is the task body's job (see
//! [`CancelToken`](super::cancel::CancelToken)).

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::trace;

struct Job {
    future: BoxFuture<'static, Result<()>>,
    done: oneshot::Sender<Result<()>>,
}

/// Handle to one submitted task.
pub struct TaskHandle {
    rx: oneshot::Receiver<Result<()>>,
}

impl TaskHandle {
    /// Wait for the task to finish and take its result. An error raised
    /// inside the task (including a panic) comes back as `Err` here.
    pub async fn wait(self) -> Result<()> {
        match self.rx.await {
            Ok(result) => result,
            Err(_) => Err(anyhow!("worker pool dropped before the task completed")),
        }
    }
}

/// Fixed-size task executor.
pub struct WorkerPool {
    tx: Option<mpsc::UnboundedSender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `workers` worker tasks (minimum 1) over a shared queue.
    pub fn new(workers: usize) -> Self {
        let (tx, rx) = mpsc::unbounded_channel::<Job>();
        let rx = Arc::new(Mutex::new(rx));

        let workers = (0..workers.max(1))
            .map(|worker_id| {
                let rx = Arc::clone(&rx);
                tokio::spawn(async move {
                    loop {
                        let job = rx.lock().await.recv().await;
                        let Some(job) = job else {
                            trace!(worker_id, "queue closed, worker exiting");
                            break;
                        };

                        let result = AssertUnwindSafe(job.future)
                            .catch_unwind()
                            .await
                            .unwrap_or_else(|panic| Err(anyhow!(panic_message(panic))));

                        // The submitter may have dropped its handle; fine.
                        let _ = job.done.send(result);
                    }
                })
            })
            .collect();

        Self {
            tx: Some(tx),
            workers,
        }
    }

    /// Size the pool to the machine.
    pub fn with_hardware_parallelism() -> Self {
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Self::new(workers)
    }

    /// Queue a task for execution. Never waits; returns immediately with a
    /// handle. After shutdown the handle resolves to an error.
    pub fn submit<F>(&self, future: F) -> TaskHandle
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let (done_tx, done_rx) = oneshot::channel();
        if let Some(tx) = &self.tx {
            let job = Job {
                future: future.boxed(),
                done: done_tx,
            };
            // A send error means the workers are gone; the dropped `done`
            // sender makes the handle resolve to an error.
            let _ = tx.send(job);
        }
        TaskHandle { rx: done_rx }
    }

    /// Stop accepting work, let the queue drain, and join every worker.
    pub async fn shutdown(mut self) {
        self.tx.take();
        for worker in self.workers.drain(..) {
            let _ = worker.await;
        }
    }
}

impl Drop for WorkerPool {
    /// Closing the queue lets workers finish the backlog and exit on their
    /// own; `shutdown` is the joining exit path.
    fn drop(&mut self) {
        self.tx.take();
    }
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        format!("task panicked: {msg}")
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        format!("task panicked: {msg}")
    } else {
        "task panicked".to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
