//! Job lifecycle integration tests.
//!
//! Covers submission validation, polling, retry behavior, and terminal
//! states. Retry tests assemble the worker stack by hand so a scripted
//! converter can stand in for the real engines.

mod common;

use common::{png_bytes, TestHarness};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use bytes::Bytes;
use tempfile::TempDir;

use recast::artifacts::ArtifactStore;
use recast::jobs::{
    Dispatch, JobService, JobState, JobStatus, RetryPolicy, Token, WorkerContext, WorkerPool,
};
use recast::registry::FormatRegistry;
use recast::store::MemoryTtlStore;
use recast::Error;
use recast_engines::{ConversionRequest, MediaFamily};

// ---------------------------------------------------------------------------
// Submission validation (nothing is queued on rejection)
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_format_is_rejected_at_submit() {
    let harness = TestHarness::new().await;

    let err = harness
        .service
        .submit(Bytes::from_static(b"MZ\x90"), "exe", "png")
        .await
        .unwrap_err();
    assert_matches!(err, Error::UnknownFormat { name } if name == "exe");
}

#[tokio::test]
async fn unknown_target_is_rejected_at_submit() {
    let harness = TestHarness::new().await;

    let err = harness
        .service
        .submit(png_bytes(4, 4), "png", "xyz")
        .await
        .unwrap_err();
    assert_matches!(err, Error::UnknownFormat { name } if name == "xyz");
}

#[tokio::test]
async fn unsupported_pair_is_rejected_at_submit() {
    let harness = TestHarness::new().await;

    // Both formats exist; no rule connects them.
    let err = harness
        .service
        .submit(png_bytes(4, 4), "png", "docx")
        .await
        .unwrap_err();
    assert_matches!(
        err,
        Error::UnsupportedConversion { input, output } if input == "png" && output == "docx"
    );
}

// ---------------------------------------------------------------------------
// Polling
// ---------------------------------------------------------------------------

#[tokio::test]
async fn poll_with_bogus_token_is_invalid() {
    let harness = TestHarness::new().await;

    let err = harness
        .service
        .poll(&Token::from("no-such-token"))
        .await
        .unwrap_err();
    assert_matches!(err, Error::InvalidToken);
}

#[tokio::test]
async fn submitted_job_reaches_succeeded() {
    let harness = TestHarness::new().await;

    let token = harness
        .service
        .submit(png_bytes(8, 8), "png", "jpeg")
        .await
        .unwrap();

    let state = harness.wait_terminal(&token).await;
    assert_eq!(state.status, JobStatus::Succeeded);
    assert_eq!(state.progress, 100);
}

#[tokio::test]
async fn progress_never_goes_backwards() {
    let harness = TestHarness::new().await;

    let token = harness
        .service
        .submit(png_bytes(16, 16), "png", "tiff")
        .await
        .unwrap();

    let mut last = 0u8;
    let state = loop {
        let state = harness.service.poll(&token).await.unwrap();
        assert!(
            state.progress >= last,
            "progress went backwards: {} -> {}",
            last,
            state.progress
        );
        last = state.progress;
        if state.status.is_terminal() {
            break state;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    };

    assert_eq!(state.status, JobStatus::Succeeded, "error: {:?}", state.error);
    assert_eq!(state.progress, 100);
}

// ---------------------------------------------------------------------------
// Retry behavior, with a scripted converter in place of the engines
// ---------------------------------------------------------------------------

/// Fails the first `failures` calls with a transient error, then succeeds
/// by echoing the input bytes.
struct FlakyDispatch {
    calls: AtomicUsize,
    failures: usize,
}

impl FlakyDispatch {
    fn failing(failures: usize) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            failures,
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Dispatch for FlakyDispatch {
    async fn dispatch(
        &self,
        _family: MediaFamily,
        input: Bytes,
        _request: &ConversionRequest,
    ) -> recast_engines::Result<Bytes> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            Err(recast_engines::Error::timeout("ffmpeg", 1))
        } else {
            Ok(input)
        }
    }
}

/// Always fails with a non-transient decode error.
#[derive(Default)]
struct RejectingDispatch {
    calls: AtomicUsize,
}

#[async_trait]
impl Dispatch for RejectingDispatch {
    async fn dispatch(
        &self,
        _family: MediaFamily,
        _input: Bytes,
        _request: &ConversionRequest,
    ) -> recast_engines::Result<Bytes> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(recast_engines::Error::decode_failed("not an image"))
    }
}

/// Assemble a one-worker stack around the given dispatch.
///
/// The [`TempDir`] must be kept alive for the artifacts to stay on disk.
async fn start_stack(
    dispatch: Arc<dyn Dispatch>,
    record_ttl: Duration,
) -> (JobService, Arc<WorkerPool>, TempDir) {
    let registry = Arc::new(FormatRegistry::builtin().unwrap());
    let store = Arc::new(MemoryTtlStore::new());
    let dir = tempfile::tempdir().unwrap();

    let context = Arc::new(WorkerContext {
        registry: registry.clone(),
        dispatch,
        store: store.clone(),
        artifacts: ArtifactStore::new(dir.path().to_path_buf()),
        retry: RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
        },
        record_ttl,
    });

    let pool = Arc::new(WorkerPool::start(context, 1, 16));
    let jobs = JobService::new(registry, pool.clone(), store, record_ttl);
    (jobs, pool, dir)
}

async fn wait_terminal(jobs: &JobService, token: &Token) -> JobState {
    for _ in 0..500 {
        let state = jobs.poll(token).await.unwrap();
        if state.status.is_terminal() {
            return state;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job did not reach a terminal state in time");
}

#[tokio::test]
async fn transient_failures_are_retried_to_success() {
    let dispatch = Arc::new(FlakyDispatch::failing(2));
    let (jobs, _pool, _dir) = start_stack(dispatch.clone(), Duration::from_secs(60)).await;

    let token = jobs.submit(png_bytes(4, 4), "png", "jpeg").await.unwrap();
    let state = wait_terminal(&jobs, &token).await;

    assert_eq!(state.status, JobStatus::Succeeded);
    assert_eq!(state.progress, 100);
    // Two failed attempts, then the one that succeeded.
    assert_eq!(dispatch.calls(), 3);
}

#[tokio::test]
async fn exhausted_retries_end_in_failure() {
    let dispatch = Arc::new(FlakyDispatch::failing(usize::MAX));
    let (jobs, _pool, _dir) = start_stack(dispatch.clone(), Duration::from_secs(60)).await;

    let token = jobs.submit(png_bytes(4, 4), "png", "jpeg").await.unwrap();
    let state = wait_terminal(&jobs, &token).await;

    assert_eq!(state.status, JobStatus::Failed);
    assert!(state.error.as_deref().unwrap_or("").contains("timed out"));
    assert_eq!(dispatch.calls(), 3);
}

#[tokio::test]
async fn non_transient_failure_is_not_retried() {
    let dispatch = Arc::new(RejectingDispatch::default());
    let (jobs, _pool, _dir) = start_stack(dispatch.clone(), Duration::from_secs(60)).await;

    let token = jobs.submit(png_bytes(4, 4), "png", "jpeg").await.unwrap();
    let state = wait_terminal(&jobs, &token).await;

    assert_eq!(state.status, JobStatus::Failed);
    assert!(state.error.as_deref().unwrap_or("").contains("decode failed"));
    assert_eq!(dispatch.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn expired_record_cannot_be_polled() {
    let dispatch = Arc::new(FlakyDispatch::failing(0));
    let (jobs, _pool, _dir) = start_stack(dispatch, Duration::from_millis(50)).await;

    let token = jobs.submit(png_bytes(4, 4), "png", "jpeg").await.unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;

    let err = jobs.poll(&token).await.unwrap_err();
    assert_matches!(err, Error::InvalidToken);
}
