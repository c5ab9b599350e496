//! Job orchestration: submission, state tracking, and the worker pool.

mod queue;
mod token;
mod types;
mod worker;

pub use queue::{JobQueue, WorkerPool};
pub use token::Token;
pub use types::{JobState, JobStatus, Milestone, WorkItem};
pub use worker::{Dispatch, EngineDispatch, RetryPolicy, WorkerContext};

pub(crate) use worker::{job_key, result_key};

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::info;

use crate::registry::FormatRegistry;
use crate::store::TtlStore;
use crate::{Error, Result};

/// Accepts conversion jobs and serves their state.
pub struct JobService {
    registry: Arc<FormatRegistry>,
    queue: Arc<dyn JobQueue>,
    store: Arc<dyn TtlStore>,
    record_ttl: Duration,
}

impl JobService {
    pub fn new(
        registry: Arc<FormatRegistry>,
        queue: Arc<dyn JobQueue>,
        store: Arc<dyn TtlStore>,
        record_ttl: Duration,
    ) -> Self {
        Self {
            registry,
            queue,
            store,
            record_ttl,
        }
    }

    /// Validate and accept a conversion job.
    ///
    /// The pair is validated against the registry before anything is stored
    /// or enqueued, so a rejected request leaves no trace. Returns the job
    /// token as soon as the item is queued; the conversion itself runs on
    /// the workers.
    pub async fn submit(
        &self,
        payload: Bytes,
        input_format: &str,
        output_format: &str,
    ) -> Result<Token> {
        let rule = self.registry.lookup_rule(input_format, output_format)?;
        let input = rule.input.clone();
        let output = rule.output.clone();

        let token = Token::generate();
        let state = JobState::queued(&input, &output);
        self.store
            .set(
                &job_key(&token),
                serde_json::to_string(&state)?,
                self.record_ttl,
            )
            .await?;

        self.queue
            .enqueue(WorkItem {
                token: token.clone(),
                input_format: input.clone(),
                output_format: output.clone(),
                payload,
            })
            .await?;

        info!(token = %token, input = %input, output = %output, "job accepted");
        Ok(token)
    }

    /// Current state of a job.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidToken`] when the token is unknown or its
    /// record has expired; the two cases are indistinguishable.
    pub async fn poll(&self, token: &Token) -> Result<JobState> {
        match self.store.get(&job_key(token)).await? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Err(Error::InvalidToken),
        }
    }
}
