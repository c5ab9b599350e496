//! Video transcoding via ffmpeg.

use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::process::Command;
use tracing::debug;

use crate::exec::run_engine;
use crate::scratch::Scratch;
use crate::types::{ConversionRequest, EngineConfig, MediaFamily};
use crate::{Converter, Error, Result};

/// Converter for video container formats.
///
/// The rule pins both a video and an audio codec for the target container.
/// When the audio codec has a known elementary-stream extension the audio
/// track is encoded into a temporary file first and then muxed in unchanged;
/// both passes share the invocation's scratch directory, so the temporary
/// track never outlives the conversion.
pub struct VideoConverter {
    config: EngineConfig,
}

impl VideoConverter {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Converter for VideoConverter {
    fn family(&self) -> MediaFamily {
        MediaFamily::Video
    }

    async fn convert(&self, input: Bytes, request: &ConversionRequest) -> Result<Bytes> {
        let video_codec = request
            .codecs
            .video
            .as_deref()
            .ok_or_else(|| Error::unsupported("video rule without a video codec"))?;
        let audio_codec = request
            .codecs
            .audio
            .as_deref()
            .ok_or_else(|| Error::unsupported("video rule without an audio codec"))?;

        let scratch =
            Scratch::new(&input, &request.input_format, &request.output_format).await?;
        debug!(
            input_format = %request.input_format,
            output_format = %request.output_format,
            video_codec,
            audio_codec,
            "converting video"
        );

        match audio_stream_ext(audio_codec) {
            Some(ext) => {
                let temp_audio = scratch.file(&format!("temp-audio.{}", ext));

                let mut extract = Command::new(&self.config.ffmpeg_path);
                extract.args(extract_audio_args(
                    scratch.input(),
                    &temp_audio,
                    audio_codec,
                ));
                run_engine(extract, "ffmpeg", self.config.timeout()).await?;

                let mut mux = Command::new(&self.config.ffmpeg_path);
                mux.args(mux_args(
                    scratch.input(),
                    &temp_audio,
                    scratch.output(),
                    video_codec,
                ));
                run_engine(mux, "ffmpeg", self.config.timeout()).await?;
            }
            None => {
                let mut cmd = Command::new(&self.config.ffmpeg_path);
                cmd.args(single_pass_args(
                    scratch.input(),
                    scratch.output(),
                    video_codec,
                    audio_codec,
                ));
                run_engine(cmd, "ffmpeg", self.config.timeout()).await?;
            }
        }

        if !scratch.output().exists() {
            return Err(Error::bad_output("ffmpeg", "no output file produced"));
        }
        scratch.read_output().await
    }
}

/// Elementary-stream file extension for an audio codec.
fn audio_stream_ext(codec: &str) -> Option<&'static str> {
    match codec {
        "aac" => Some("m4a"),
        "libmp3lame" => Some("mp3"),
        "libvorbis" => Some("ogg"),
        "libopus" => Some("opus"),
        "mp2" => Some("mp2"),
        "wmav2" => Some("wma"),
        _ => None,
    }
}

fn extract_audio_args(input: &Path, temp_audio: &Path, audio_codec: &str) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-i".to_string(),
        input.to_string_lossy().into_owned(),
        "-vn".to_string(),
        "-c:a".to_string(),
        audio_codec.to_string(),
        temp_audio.to_string_lossy().into_owned(),
    ]
}

fn mux_args(input: &Path, temp_audio: &Path, output: &Path, video_codec: &str) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-i".to_string(),
        input.to_string_lossy().into_owned(),
        "-i".to_string(),
        temp_audio.to_string_lossy().into_owned(),
        "-map".to_string(),
        "0:v:0".to_string(),
        "-map".to_string(),
        "1:a:0".to_string(),
        "-c:v".to_string(),
        video_codec.to_string(),
        "-c:a".to_string(),
        "copy".to_string(),
        output.to_string_lossy().into_owned(),
    ]
}

fn single_pass_args(
    input: &Path,
    output: &Path,
    video_codec: &str,
    audio_codec: &str,
) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-i".to_string(),
        input.to_string_lossy().into_owned(),
        "-c:v".to_string(),
        video_codec.to_string(),
        "-c:a".to_string(),
        audio_codec.to_string(),
        output.to_string_lossy().into_owned(),
    ]
}
