//! Pluggable job queue and the bundled channel-backed worker pool.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};

use super::types::WorkItem;
use super::worker::{run_job, WorkerContext};
use crate::{Error, Result};

/// Transport that carries accepted jobs to the workers.
///
/// The bundled implementation is an in-process channel; a broker-backed
/// queue plugs in behind this trait.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Hand a validated work item to the workers.
    ///
    /// Returns [`Error::QueueClosed`] once the workers have stopped.
    async fn enqueue(&self, item: WorkItem) -> Result<()>;
}

/// Pool of conversion workers sharing one bounded channel.
///
/// Submission applies backpressure once the channel is full. The pool
/// stops when all handles are dropped or [`WorkerPool::shutdown`] aborts
/// the workers.
pub struct WorkerPool {
    sender: mpsc::Sender<WorkItem>,
    handles: Vec<tokio::task::JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `workers` background workers draining a channel of `capacity`.
    pub fn start(context: Arc<WorkerContext>, workers: usize, capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity);
        let receiver = Arc::new(Mutex::new(receiver));

        let handles = (0..workers)
            .map(|worker_id| {
                let receiver = Arc::clone(&receiver);
                let context = Arc::clone(&context);
                tokio::spawn(drain_jobs(worker_id, receiver, context))
            })
            .collect();

        Self { sender, handles }
    }

    /// Abort the workers. Jobs already running are dropped mid-flight.
    pub fn shutdown(&self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}

#[async_trait]
impl JobQueue for WorkerPool {
    async fn enqueue(&self, item: WorkItem) -> Result<()> {
        debug!(token = %item.token, "enqueueing work item");
        self.sender.send(item).await.map_err(|_| Error::QueueClosed)
    }
}

/// Background loop draining the shared channel.
///
/// The receiver lock is released before the job runs, so workers convert
/// concurrently and only dequeueing is serialized.
async fn drain_jobs(
    worker_id: usize,
    receiver: Arc<Mutex<mpsc::Receiver<WorkItem>>>,
    context: Arc<WorkerContext>,
) {
    info!(worker_id, "conversion worker started");

    loop {
        let item = {
            let mut receiver = receiver.lock().await;
            receiver.recv().await
        };

        match item {
            Some(item) => run_job(&context, item).await,
            None => break,
        }
    }

    info!(worker_id, "conversion worker stopped (queue closed)");
}
