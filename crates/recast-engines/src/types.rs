//! Shared types describing a conversion request.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Media family a format belongs to.
///
/// The family of the output format selects which converter handles the
/// request; the set is closed and dispatch is a static match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaFamily {
    Image,
    Document,
    Audio,
    Video,
}

impl fmt::Display for MediaFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Image => "image",
            Self::Document => "document",
            Self::Audio => "audio",
            Self::Video => "video",
        };
        write!(f, "{}", name)
    }
}

/// Engine that performs a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    /// In-process image codec (no subprocess).
    #[serde(rename = "image-codec")]
    ImageCodec,
    /// Markup transformation engine for text-structured documents.
    Pandoc,
    /// Layout rendering engine for office formats and PDF generation.
    LibreOffice,
    /// Audio/video transcoding pipeline.
    Ffmpeg,
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ImageCodec => "image-codec",
            Self::Pandoc => "pandoc",
            Self::LibreOffice => "libreoffice",
            Self::Ffmpeg => "ffmpeg",
        };
        write!(f, "{}", name)
    }
}

/// Codec parameters bound to a conversion rule.
///
/// For audio targets only `audio` is set (or neither, when the pipeline
/// default applies, e.g. wav). Video targets set both: the container's
/// video codec and its embedded audio codec.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
}

/// One resolved conversion request handed to a converter.
///
/// Formats are canonical names; the registry has already validated the pair
/// and attached the engine and codecs from its rule.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub input_format: String,
    pub output_format: String,
    pub engine: Engine,
    pub codecs: CodecParams,
}

/// Configuration for engine invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Path to the pandoc binary.
    #[serde(default = "default_pandoc_path")]
    pub pandoc_path: PathBuf,

    /// Path to the libreoffice binary.
    #[serde(default = "default_libreoffice_path")]
    pub libreoffice_path: PathBuf,

    /// Path to the ffmpeg binary.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    /// Timeout for a single engine invocation in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_pandoc_path() -> PathBuf {
    PathBuf::from("pandoc")
}

fn default_libreoffice_path() -> PathBuf {
    PathBuf::from("libreoffice")
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_timeout() -> u64 {
    300
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pandoc_path: default_pandoc_path(),
            libreoffice_path: default_libreoffice_path(),
            ffmpeg_path: default_ffmpeg_path(),
            timeout_secs: default_timeout(),
        }
    }
}

impl EngineConfig {
    /// Timeout as a [`std::time::Duration`].
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }
}
