//! # recast-engines
//!
//! Conversion engine library for media and document files.
//!
//! This crate provides the converters behind the conversion service:
//! - In-process raster image re-encoding, normalized to three-channel RGB
//! - Document conversion via pandoc and libreoffice
//! - Audio and video transcoding via ffmpeg
//!
//! A converter is selected by the media family of the target format and
//! invoked through [`Dispatcher`]. External engines run as subprocesses with
//! a timeout; every invocation owns a scratch directory that is removed on
//! all exit paths.
//!
//! ## Example
//!
//! ```no_run
//! use bytes::Bytes;
//! use recast_engines::{
//!     CodecParams, ConversionRequest, Dispatcher, Engine, EngineConfig, MediaFamily,
//! };
//!
//! # async fn demo(input: Bytes) -> recast_engines::Result<()> {
//! let dispatcher = Dispatcher::new(EngineConfig::default());
//! let request = ConversionRequest {
//!     input_format: "png".to_string(),
//!     output_format: "jpeg".to_string(),
//!     engine: Engine::ImageCodec,
//!     codecs: CodecParams::default(),
//! };
//! let jpeg = dispatcher.convert(MediaFamily::Image, input, &request).await?;
//! # let _ = jpeg;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use bytes::Bytes;

pub mod audio;
pub mod document;
mod error;
mod exec;
pub mod images;
pub mod scratch;
pub mod tools;
pub mod types;
pub mod video;

// Re-exports
pub use audio::AudioConverter;
pub use document::DocumentConverter;
pub use error::{Error, Result};
pub use images::ImageConverter;
pub use scratch::Scratch;
pub use tools::{check_tool, check_tools, require_tool, ToolInfo};
pub use types::{CodecParams, ConversionRequest, Engine, EngineConfig, MediaFamily};
pub use video::VideoConverter;

/// A converter for one media family.
#[async_trait]
pub trait Converter: Send + Sync {
    /// The media family this converter handles.
    fn family(&self) -> MediaFamily;

    /// Convert input bytes into the requested output format.
    async fn convert(&self, input: Bytes, request: &ConversionRequest) -> Result<Bytes>;
}

/// Static dispatch table over the four media families.
///
/// Built once at startup from the engine configuration and shared for the
/// life of the process.
pub struct Dispatcher {
    image: ImageConverter,
    document: DocumentConverter,
    audio: AudioConverter,
    video: VideoConverter,
}

impl Dispatcher {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            image: ImageConverter::new(),
            document: DocumentConverter::new(config.clone()),
            audio: AudioConverter::new(config.clone()),
            video: VideoConverter::new(config),
        }
    }

    /// The converter handling a media family.
    pub fn converter_for(&self, family: MediaFamily) -> &dyn Converter {
        match family {
            MediaFamily::Image => &self.image,
            MediaFamily::Document => &self.document,
            MediaFamily::Audio => &self.audio,
            MediaFamily::Video => &self.video,
        }
    }

    /// Convert input bytes using the converter for the given family.
    pub async fn convert(
        &self,
        family: MediaFamily,
        input: Bytes,
        request: &ConversionRequest,
    ) -> Result<Bytes> {
        self.converter_for(family).convert(input, request).await
    }
}
