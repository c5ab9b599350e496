//! Audio transcoding via ffmpeg.

use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::process::Command;
use tracing::debug;

use crate::exec::run_engine;
use crate::scratch::Scratch;
use crate::types::{ConversionRequest, EngineConfig, MediaFamily};
use crate::{Converter, Error, Result};

/// Converter for audio formats.
///
/// Runs one ffmpeg pass with the rule's audio codec. Targets without a
/// pinned codec (wav) let ffmpeg pick its container default.
pub struct AudioConverter {
    config: EngineConfig,
}

impl AudioConverter {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Converter for AudioConverter {
    fn family(&self) -> MediaFamily {
        MediaFamily::Audio
    }

    async fn convert(&self, input: Bytes, request: &ConversionRequest) -> Result<Bytes> {
        let scratch =
            Scratch::new(&input, &request.input_format, &request.output_format).await?;
        debug!(
            input_format = %request.input_format,
            output_format = %request.output_format,
            codec = request.codecs.audio.as_deref().unwrap_or("default"),
            "converting audio"
        );

        let mut cmd = Command::new(&self.config.ffmpeg_path);
        cmd.args(audio_args(
            scratch.input(),
            scratch.output(),
            request.codecs.audio.as_deref(),
        ));

        run_engine(cmd, "ffmpeg", self.config.timeout()).await?;

        if !scratch.output().exists() {
            return Err(Error::bad_output("ffmpeg", "no output file produced"));
        }
        scratch.read_output().await
    }
}

fn audio_args(input: &Path, output: &Path, codec: Option<&str>) -> Vec<String> {
    let mut args = vec![
        "-y".to_string(),
        "-i".to_string(),
        input.to_string_lossy().into_owned(),
        // Strip any video stream, e.g. embedded album art.
        "-vn".to_string(),
    ];
    if let Some(codec) = codec {
        args.push("-c:a".to_string());
        args.push(codec.to_string());
    }
    args.push(output.to_string_lossy().into_owned());
    args
}
