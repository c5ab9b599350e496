//! Format registry types.

use recast_engines::{CodecParams, ConversionRequest, Engine, MediaFamily};
use serde::Deserialize;

/// A registered format.
#[derive(Debug, Clone)]
pub struct FormatEntry {
    /// Canonical lowercase name.
    pub name: String,

    /// Media family the format belongs to.
    pub family: MediaFamily,

    /// Alternative names that resolve to this format.
    pub aliases: Vec<String>,
}

/// One supported conversion pair with its execution parameters.
///
/// Presence of a rule is the sole supportedness signal: a pair without a
/// rule is unsupported, there is no secondary check.
#[derive(Debug, Clone)]
pub struct ConversionRule {
    /// Canonical input format name.
    pub input: String,

    /// Canonical output format name.
    pub output: String,

    /// Family of the output format; selects the converter.
    pub family: MediaFamily,

    /// Engine that executes this pair.
    pub engine: Engine,

    /// Codec parameters for ffmpeg-backed pairs.
    pub codecs: CodecParams,
}

impl ConversionRule {
    /// Build the request handed to a converter for this rule.
    pub fn to_request(&self) -> ConversionRequest {
        ConversionRequest {
            input_format: self.input.clone(),
            output_format: self.output.clone(),
            engine: self.engine,
            codecs: self.codecs.clone(),
        }
    }
}

/// Top-level shape of a registry data file.
#[derive(Debug, Deserialize)]
pub(crate) struct FormatDoc {
    #[serde(default)]
    pub image: Vec<ImageFormatDef>,
    #[serde(default)]
    pub document: Vec<DocumentFormatDef>,
    #[serde(default)]
    pub audio: Vec<AudioFormatDef>,
    #[serde(default)]
    pub video: Vec<VideoFormatDef>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ImageFormatDef {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub outputs: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DocumentFormatDef {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub outputs: Vec<DocumentOutputDef>,
}

/// A document output pair names its engine explicitly.
#[derive(Debug, Deserialize)]
pub(crate) struct DocumentOutputDef {
    pub to: String,
    pub engine: Engine,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AudioFormatDef {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Codec used when this format is the conversion target. Absent means
    /// the pipeline default for the container (wav).
    #[serde(default)]
    pub codec: Option<String>,
    #[serde(default)]
    pub outputs: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VideoFormatDef {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Video codec used when this format is the conversion target.
    pub video_codec: String,
    /// Audio codec for the embedded track of this container.
    pub audio_codec: String,
    #[serde(default)]
    pub outputs: Vec<String>,
}
