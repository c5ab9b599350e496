//! Service wiring: construction and shutdown of the conversion stack.

use std::sync::Arc;

use bytes::Bytes;
use tokio::task::JoinHandle;
use tracing::info;

use recast_engines::Dispatcher;

use crate::artifacts::{start_sweep_task, ArtifactStore, ArtifactSweeper};
use crate::config::Config;
use crate::jobs::{EngineDispatch, JobService, JobState, Token, WorkerContext, WorkerPool};
use crate::registry::FormatRegistry;
use crate::results::{Artifact, ResultResolver};
use crate::store::{start_purge_task, MemoryTtlStore};
use crate::Result;

/// The assembled conversion service.
///
/// Owns the worker pool and the background maintenance tasks; dropping
/// the service stops them.
pub struct ConvertService {
    registry: Arc<FormatRegistry>,
    jobs: JobService,
    results: ResultResolver,
    pool: Arc<WorkerPool>,
    tasks: Vec<JoinHandle<()>>,
}

impl ConvertService {
    /// Build and start the service from a configuration.
    pub async fn start(config: &Config) -> Result<Self> {
        let registry = Arc::new(match &config.formats.path {
            Some(path) => FormatRegistry::from_path(path)?,
            None => FormatRegistry::builtin()?,
        });

        let store = MemoryTtlStore::new();
        let retention = config.storage.retention();

        // Create the artifact root up front so the first sweep does not
        // trip over a missing directory.
        tokio::fs::create_dir_all(&config.storage.output_dir).await?;
        let artifacts = ArtifactStore::new(config.storage.output_dir.clone());

        let context = Arc::new(WorkerContext {
            registry: registry.clone(),
            dispatch: Arc::new(EngineDispatch::new(Dispatcher::new(config.engines.clone()))),
            store: Arc::new(store.clone()),
            artifacts,
            retry: config.retry.policy(),
            record_ttl: retention,
        });

        let workers = config.queue.worker_count();
        let pool = Arc::new(WorkerPool::start(context, workers, config.queue.capacity));

        let jobs = JobService::new(
            registry.clone(),
            pool.clone(),
            Arc::new(store.clone()),
            retention,
        );
        let results = ResultResolver::new(Arc::new(store.clone()), retention);

        let sweeper = ArtifactSweeper::new(config.storage.output_dir.clone(), retention);
        let tasks = vec![
            start_sweep_task(sweeper, config.storage.sweep_interval()),
            start_purge_task(store, config.storage.sweep_interval()),
        ];

        info!(
            workers,
            formats = registry.formats().count(),
            output_dir = %config.storage.output_dir.display(),
            "conversion service started"
        );

        Ok(Self {
            registry,
            jobs,
            results,
            pool,
            tasks,
        })
    }

    pub fn registry(&self) -> &FormatRegistry {
        &self.registry
    }

    /// Accept a conversion job; see [`JobService::submit`].
    pub async fn submit(
        &self,
        payload: Bytes,
        input_format: &str,
        output_format: &str,
    ) -> Result<Token> {
        self.jobs.submit(payload, input_format, output_format).await
    }

    /// Report a job's current state; see [`JobService::poll`].
    pub async fn poll(&self, token: &Token) -> Result<JobState> {
        self.jobs.poll(token).await
    }

    /// Fetch a finished artifact; see [`ResultResolver::fetch`].
    pub async fn fetch(&self, token: &Token) -> Result<Artifact> {
        self.results.fetch(token).await
    }

    /// Stop the workers and the maintenance tasks.
    pub fn shutdown(&self) {
        self.pool.shutdown();
        for task in &self.tasks {
            task.abort();
        }
    }
}

impl Drop for ConvertService {
    fn drop(&mut self) {
        self.shutdown();
    }
}
