//! Conversion worker: runs queued jobs to completion.
//!
//! A worker re-loads the job record, resolves the conversion rule, drives
//! the converter through the dispatch seam, and persists the artifact. Every
//! milestone is written back to the TTL store so polling clients see
//! progress; transient failures are retried with exponential backoff.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use recast_engines::{ConversionRequest, Dispatcher, MediaFamily};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::artifacts::ArtifactStore;
use crate::registry::FormatRegistry;
use crate::store::TtlStore;
use crate::Result;

use super::token::Token;
use super::types::{JobState, Milestone, WorkItem};

/// Key of the job record for a token.
pub(crate) fn job_key(token: &Token) -> String {
    format!("job:{}", token)
}

/// Key of the result record for a token.
pub(crate) fn result_key(token: &Token) -> String {
    format!("result:{}", token)
}

/// Bounded retry with exponential backoff for transient failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, the first one included.
    pub max_attempts: u32,

    /// Delay before the second attempt; doubles for each one after.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Delay before the retry following the given 1-based attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

/// Seam between the worker and the converter dispatch table.
///
/// Production uses [`EngineDispatch`]; tests substitute their own to
/// observe or script converter behavior.
#[async_trait]
pub trait Dispatch: Send + Sync {
    async fn dispatch(
        &self,
        family: MediaFamily,
        input: Bytes,
        request: &ConversionRequest,
    ) -> recast_engines::Result<Bytes>;
}

/// Dispatch backed by the engine [`Dispatcher`].
pub struct EngineDispatch {
    dispatcher: Dispatcher,
}

impl EngineDispatch {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }
}

#[async_trait]
impl Dispatch for EngineDispatch {
    async fn dispatch(
        &self,
        family: MediaFamily,
        input: Bytes,
        request: &ConversionRequest,
    ) -> recast_engines::Result<Bytes> {
        self.dispatcher.convert(family, input, request).await
    }
}

/// Shared dependencies of the conversion workers.
pub struct WorkerContext {
    pub registry: Arc<FormatRegistry>,
    pub dispatch: Arc<dyn Dispatch>,
    pub store: Arc<dyn TtlStore>,
    pub artifacts: ArtifactStore,
    pub retry: RetryPolicy,

    /// TTL applied to every job and result record write.
    pub record_ttl: Duration,
}

/// Run one work item to a terminal state.
///
/// Failures of the conversion itself are recorded in the job record; only
/// store errors propagate to the caller's log.
pub(crate) async fn run_job(ctx: &WorkerContext, item: WorkItem) {
    let token = item.token.clone();
    if let Err(e) = process(ctx, item).await {
        error!(token = %token, error = %e, "could not persist job state");
    }
}

async fn process(ctx: &WorkerContext, item: WorkItem) -> Result<()> {
    let key = job_key(&item.token);

    // The record may have expired while the item sat in the queue.
    let Some(mut state) = load_state(ctx, &key).await? else {
        warn!(token = %item.token, "job record missing or expired, dropping work item");
        return Ok(());
    };

    info!(
        token = %item.token,
        input = %item.input_format,
        output = %item.output_format,
        "job started"
    );
    state.advance(Milestone::Accepted);
    save_state(ctx, &key, &state).await?;

    let rule = match ctx.registry.lookup_rule(&item.input_format, &item.output_format) {
        Ok(rule) => rule,
        Err(e) => {
            // The pair was validated at submit; a miss here means the worker
            // runs against different registry data.
            error!(token = %item.token, error = %e, "rule lookup failed in worker");
            state.fail(&e.to_string());
            return save_state(ctx, &key, &state).await;
        }
    };
    state.advance(Milestone::RuleResolved);
    save_state(ctx, &key, &state).await?;

    let request = rule.to_request();
    let mut attempt: u32 = 1;

    loop {
        state.advance(Milestone::EngineInvoked);
        save_state(ctx, &key, &state).await?;

        match convert_and_persist(ctx, &item, rule.family, &request, &mut state, &key).await {
            Ok(file_name) => {
                state.succeed();
                save_state(ctx, &key, &state).await?;
                info!(token = %item.token, file = %file_name, "job succeeded");
                return Ok(());
            }
            Err(e) if e.is_transient() && attempt < ctx.retry.max_attempts => {
                let delay = ctx.retry.delay_for(attempt);
                warn!(
                    token = %item.token,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "transient failure, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                error!(token = %item.token, attempts = attempt, error = %e, "job failed");
                state.fail(&e.to_string());
                return save_state(ctx, &key, &state).await;
            }
        }
    }
}

/// One conversion attempt: dispatch, persist the artifact, then write the
/// result record. The record is only written after the artifact bytes are
/// fully on disk.
async fn convert_and_persist(
    ctx: &WorkerContext,
    item: &WorkItem,
    family: MediaFamily,
    request: &ConversionRequest,
    state: &mut JobState,
    key: &str,
) -> Result<String> {
    let output = ctx
        .dispatch
        .dispatch(family, item.payload.clone(), request)
        .await?;

    state.advance(Milestone::Converted);
    save_state(ctx, key, state).await?;

    let file_name = artifact_file_name(&item.token, &item.output_format);
    let path = ctx.artifacts.write(&file_name, &output).await?;

    ctx.store
        .set(
            &result_key(&item.token),
            path.to_string_lossy().into_owned(),
            ctx.record_ttl,
        )
        .await?;

    state.advance(Milestone::ArtifactWritten);
    save_state(ctx, key, state).await?;

    Ok(file_name)
}

/// Artifact file name: token, a short random suffix, and the target
/// extension. Unguessable like the token, and prefix-scannable by it.
fn artifact_file_name(token: &Token, output_format: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}{}.{}", token, &suffix[..8], output_format)
}

async fn load_state(ctx: &WorkerContext, key: &str) -> Result<Option<JobState>> {
    match ctx.store.get(key).await? {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

async fn save_state(ctx: &WorkerContext, key: &str, state: &JobState) -> Result<()> {
    let json = serde_json::to_string(state)?;
    ctx.store.set(key, json, ctx.record_ttl).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::types::JobStatus;
    use crate::store::MemoryTtlStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubDispatch {
        calls: AtomicUsize,
    }

    impl StubDispatch {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Dispatch for StubDispatch {
        async fn dispatch(
            &self,
            _family: MediaFamily,
            input: Bytes,
            _request: &ConversionRequest,
        ) -> recast_engines::Result<Bytes> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(input)
        }
    }

    struct FailingDispatch {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Dispatch for FailingDispatch {
        async fn dispatch(
            &self,
            _family: MediaFamily,
            _input: Bytes,
            _request: &ConversionRequest,
        ) -> recast_engines::Result<Bytes> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(recast_engines::Error::decode_failed("not a png"))
        }
    }

    fn context(dispatch: Arc<dyn Dispatch>, dir: &std::path::Path) -> (WorkerContext, MemoryTtlStore) {
        let store = MemoryTtlStore::new();
        let ctx = WorkerContext {
            registry: Arc::new(FormatRegistry::builtin().unwrap()),
            dispatch,
            store: Arc::new(store.clone()),
            artifacts: ArtifactStore::new(dir.to_path_buf()),
            retry: RetryPolicy {
                max_attempts: 3,
                base_delay: Duration::from_millis(1),
            },
            record_ttl: Duration::from_secs(60),
        };
        (ctx, store)
    }

    async fn seed_job(store: &MemoryTtlStore, token: &Token) {
        let state = JobState::queued("png", "jpeg");
        store
            .set(
                &job_key(token),
                serde_json::to_string(&state).unwrap(),
                Duration::from_secs(60),
            )
            .await
            .unwrap();
    }

    fn work_item(token: &Token) -> WorkItem {
        WorkItem {
            token: token.clone(),
            input_format: "png".to_string(),
            output_format: "jpeg".to_string(),
            payload: Bytes::from_static(b"fake image data"),
        }
    }

    #[test]
    fn test_artifact_file_name_shape() {
        let token = Token::generate();
        let name = artifact_file_name(&token, "jpeg");
        assert!(name.starts_with(token.as_str()));
        assert!(name.ends_with(".jpeg"));
        // token + 8 random chars + ".jpeg"
        assert_eq!(name.len(), token.as_str().len() + 8 + 5);
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy {
            max_attempts: 4,
            base_delay: Duration::from_secs(10),
        };
        assert_eq!(policy.delay_for(1), Duration::from_secs(10));
        assert_eq!(policy.delay_for(2), Duration::from_secs(20));
        assert_eq!(policy.delay_for(3), Duration::from_secs(40));
    }

    #[tokio::test]
    async fn test_successful_job_records_result() {
        let dir = tempfile::tempdir().unwrap();
        let dispatch = Arc::new(StubDispatch::new());
        let (ctx, store) = context(dispatch.clone(), dir.path());
        let token = Token::generate();
        seed_job(&store, &token).await;

        run_job(&ctx, work_item(&token)).await;

        let state: JobState =
            serde_json::from_str(&store.get(&job_key(&token)).await.unwrap().unwrap()).unwrap();
        assert_eq!(state.status, JobStatus::Succeeded);
        assert_eq!(state.progress, 100);
        assert_eq!(dispatch.calls.load(Ordering::SeqCst), 1);

        let path = store.get(&result_key(&token)).await.unwrap().unwrap();
        assert!(std::path::Path::new(&path).exists());
    }

    #[tokio::test]
    async fn test_non_transient_failure_is_not_retried() {
        let dir = tempfile::tempdir().unwrap();
        let dispatch = Arc::new(FailingDispatch {
            calls: AtomicUsize::new(0),
        });
        let (ctx, store) = context(dispatch.clone(), dir.path());
        let token = Token::generate();
        seed_job(&store, &token).await;

        run_job(&ctx, work_item(&token)).await;

        let state: JobState =
            serde_json::from_str(&store.get(&job_key(&token)).await.unwrap().unwrap()).unwrap();
        assert_eq!(state.status, JobStatus::Failed);
        assert!(state.error.unwrap().contains("decode failed"));
        assert_eq!(dispatch.calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.get(&result_key(&token)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expired_record_drops_work_item() {
        let dir = tempfile::tempdir().unwrap();
        let dispatch = Arc::new(StubDispatch::new());
        let (ctx, store) = context(dispatch.clone(), dir.path());
        let token = Token::generate();
        // no job record seeded

        run_job(&ctx, work_item(&token)).await;

        assert_eq!(dispatch.calls.load(Ordering::SeqCst), 0);
        assert!(store.is_empty());
    }
}
