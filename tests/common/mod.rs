//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which starts a full [`ConvertService`] over a
//! temporary artifact directory, with one worker and fast retry and sweep
//! timings.

use std::time::Duration;

use bytes::Bytes;
use tempfile::TempDir;

use recast::config::Config;
use recast::jobs::{JobState, Token};
use recast::service::ConvertService;

/// Test harness wrapping a running [`ConvertService`] backed by a temporary
/// artifact directory. The directory is deleted on drop.
pub struct TestHarness {
    pub service: ConvertService,
    pub dir: TempDir,
}

impl TestHarness {
    /// Create a new harness with fast timings and a single worker.
    pub async fn new() -> Self {
        let mut config = Config::default();
        config.storage.retention_secs = 60;
        config.storage.sweep_interval_secs = 1;
        config.queue.workers = 1;
        config.retry.base_delay_ms = 1;
        Self::with_config(config).await
    }

    /// Create a new harness from a custom configuration.
    ///
    /// The configured `output_dir` is replaced with the temporary one.
    #[allow(dead_code)]
    pub async fn with_config(config: Config) -> Self {
        Self::start(config).await
    }

    async fn start(mut config: Config) -> Self {
        let dir = tempfile::tempdir().expect("failed to create artifact dir");
        config.storage.output_dir = dir.path().to_path_buf();

        let service = ConvertService::start(&config)
            .await
            .expect("failed to start service");

        Self { service, dir }
    }

    /// Poll until the job reaches a terminal state.
    pub async fn wait_terminal(&self, token: &Token) -> JobState {
        for _ in 0..1500 {
            let state = self
                .service
                .poll(token)
                .await
                .expect("job record vanished while polling");
            if state.status.is_terminal() {
                return state;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("job did not reach a terminal state in time");
    }
}

/// A small in-memory PNG for image conversion tests.
pub fn png_bytes(width: u32, height: u32) -> Bytes {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x * 20) as u8, (y * 20) as u8, 128])
    });

    let mut cursor = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut cursor, image::ImageFormat::Png)
        .expect("failed to encode test png");

    Bytes::from(cursor.into_inner())
}
