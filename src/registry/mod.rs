//! Format registry: known formats, aliases, and conversion rules.
//!
//! The registry is built once at startup from a declarative data file and
//! never mutated afterwards, so it is shared by reference without locking.
//! Presence of a [`ConversionRule`] for a pair is the only signal that the
//! pair is supported.

mod types;

pub use types::{ConversionRule, FormatEntry};

use std::collections::HashMap;
use std::path::Path;

use recast_engines::{CodecParams, Engine, MediaFamily};

use crate::{Error, Result};
use types::FormatDoc;

/// Registry data compiled into the binary.
const BUILTIN_FORMATS: &str = include_str!("formats.toml");

/// Immutable lookup tables for formats and conversion pairs.
#[derive(Debug)]
pub struct FormatRegistry {
    formats: HashMap<String, FormatEntry>,
    /// Every accepted name, canonical ones included, mapped to its
    /// canonical form. Makes resolution a single lookup and idempotent.
    aliases: HashMap<String, String>,
    rules: HashMap<String, HashMap<String, ConversionRule>>,
    /// Supported outputs per canonical input, in declaration order.
    outputs: HashMap<String, Vec<String>>,
}

impl FormatRegistry {
    /// Build the registry from the data compiled into the binary.
    pub fn builtin() -> Result<Self> {
        Self::from_toml(BUILTIN_FORMATS)
    }

    /// Build the registry from a data file on disk.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::InvalidRegistry(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&text)
    }

    /// Build the registry from TOML text, validating it fully.
    pub fn from_toml(text: &str) -> Result<Self> {
        let doc: FormatDoc =
            toml::from_str(text).map_err(|e| Error::InvalidRegistry(e.to_string()))?;
        Self::build(doc)
    }

    fn build(doc: FormatDoc) -> Result<Self> {
        let mut formats = HashMap::new();
        let mut aliases = HashMap::new();

        for def in &doc.image {
            register(&mut formats, &mut aliases, &def.name, &def.aliases, MediaFamily::Image)?;
        }
        for def in &doc.document {
            register(&mut formats, &mut aliases, &def.name, &def.aliases, MediaFamily::Document)?;
        }
        for def in &doc.audio {
            register(&mut formats, &mut aliases, &def.name, &def.aliases, MediaFamily::Audio)?;
        }
        for def in &doc.video {
            register(&mut formats, &mut aliases, &def.name, &def.aliases, MediaFamily::Video)?;
        }

        let mut rules: HashMap<String, HashMap<String, ConversionRule>> = HashMap::new();
        let mut outputs: HashMap<String, Vec<String>> =
            formats.keys().map(|name| (name.clone(), Vec::new())).collect();

        for def in &doc.image {
            for out in &def.outputs {
                add_rule(
                    &formats,
                    &mut rules,
                    &mut outputs,
                    &def.name.to_lowercase(),
                    &out.to_lowercase(),
                    MediaFamily::Image,
                    Engine::ImageCodec,
                    CodecParams::default(),
                )?;
            }
        }

        for def in &doc.document {
            for out in &def.outputs {
                add_rule(
                    &formats,
                    &mut rules,
                    &mut outputs,
                    &def.name.to_lowercase(),
                    &out.to.to_lowercase(),
                    MediaFamily::Document,
                    out.engine,
                    CodecParams::default(),
                )?;
            }
        }

        // Audio and video codecs hang off the entry for the target format.
        let audio_codecs: HashMap<String, Option<String>> = doc
            .audio
            .iter()
            .map(|d| (d.name.to_lowercase(), d.codec.clone()))
            .collect();
        for def in &doc.audio {
            for out in &def.outputs {
                let out = out.to_lowercase();
                let codec = audio_codecs.get(&out).cloned().flatten();
                add_rule(
                    &formats,
                    &mut rules,
                    &mut outputs,
                    &def.name.to_lowercase(),
                    &out,
                    MediaFamily::Audio,
                    Engine::Ffmpeg,
                    CodecParams {
                        video: None,
                        audio: codec,
                    },
                )?;
            }
        }

        let video_codecs: HashMap<String, (String, String)> = doc
            .video
            .iter()
            .map(|d| {
                (
                    d.name.to_lowercase(),
                    (d.video_codec.clone(), d.audio_codec.clone()),
                )
            })
            .collect();
        for def in &doc.video {
            for out in &def.outputs {
                let out = out.to_lowercase();
                let codecs = video_codecs
                    .get(&out)
                    .map(|(video, audio)| CodecParams {
                        video: Some(video.clone()),
                        audio: Some(audio.clone()),
                    })
                    .unwrap_or_default();
                add_rule(
                    &formats,
                    &mut rules,
                    &mut outputs,
                    &def.name.to_lowercase(),
                    &out,
                    MediaFamily::Video,
                    Engine::Ffmpeg,
                    codecs,
                )?;
            }
        }

        Ok(Self {
            formats,
            aliases,
            rules,
            outputs,
        })
    }

    /// Resolve a name or alias to its canonical format name.
    ///
    /// Resolution is case-insensitive and idempotent: a canonical name
    /// resolves to itself.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownFormat`] for names outside the registry.
    pub fn resolve(&self, name: &str) -> Result<&str> {
        self.aliases
            .get(&name.to_lowercase())
            .map(String::as_str)
            .ok_or_else(|| Error::unknown_format(name))
    }

    /// Look up the entry for a format name or alias.
    pub fn entry(&self, name: &str) -> Result<&FormatEntry> {
        let canonical = self.resolve(name)?;
        self.formats
            .get(canonical)
            .ok_or_else(|| Error::unknown_format(name))
    }

    /// Look up the rule for a conversion pair.
    ///
    /// Both names may be aliases. Absence of a rule means the pair is
    /// unsupported.
    pub fn lookup_rule(&self, input: &str, output: &str) -> Result<&ConversionRule> {
        let input = self.resolve(input)?;
        let output = self.resolve(output)?;
        self.rules
            .get(input)
            .and_then(|m| m.get(output))
            .ok_or_else(|| Error::unsupported_conversion(input, output))
    }

    /// Supported output formats for an input, in registry order.
    pub fn list_outputs(&self, input: &str) -> Result<&[String]> {
        let input = self.resolve(input)?;
        self.outputs
            .get(input)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::unknown_format(input))
    }

    /// Iterate over all registered formats, in no particular order.
    pub fn formats(&self) -> impl Iterator<Item = &FormatEntry> {
        self.formats.values()
    }
}

fn register(
    formats: &mut HashMap<String, FormatEntry>,
    aliases: &mut HashMap<String, String>,
    name: &str,
    extra: &[String],
    family: MediaFamily,
) -> Result<()> {
    let name = name.to_lowercase();
    if formats.contains_key(&name) {
        return Err(Error::InvalidRegistry(format!("duplicate format '{}'", name)));
    }
    if aliases.insert(name.clone(), name.clone()).is_some() {
        return Err(Error::InvalidRegistry(format!(
            "format '{}' collides with an existing alias",
            name
        )));
    }

    let mut lowered = Vec::with_capacity(extra.len());
    for alias in extra {
        let alias = alias.to_lowercase();
        if aliases.insert(alias.clone(), name.clone()).is_some() {
            return Err(Error::InvalidRegistry(format!(
                "alias '{}' of '{}' is already taken",
                alias, name
            )));
        }
        lowered.push(alias);
    }

    formats.insert(
        name.clone(),
        FormatEntry {
            name,
            family,
            aliases: lowered,
        },
    );
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn add_rule(
    formats: &HashMap<String, FormatEntry>,
    rules: &mut HashMap<String, HashMap<String, ConversionRule>>,
    outputs: &mut HashMap<String, Vec<String>>,
    input: &str,
    output: &str,
    family: MediaFamily,
    engine: Engine,
    codecs: CodecParams,
) -> Result<()> {
    if input == output {
        return Err(Error::InvalidRegistry(format!(
            "format '{}' lists itself as an output",
            input
        )));
    }

    match formats.get(output) {
        Some(entry) if entry.family == family => {}
        Some(entry) => {
            return Err(Error::InvalidRegistry(format!(
                "output '{}' of '{}' is a {} format, expected {}",
                output, input, entry.family, family
            )));
        }
        None => {
            return Err(Error::InvalidRegistry(format!(
                "output '{}' of '{}' is not a registered format",
                output, input
            )));
        }
    }

    let rule = ConversionRule {
        input: input.to_string(),
        output: output.to_string(),
        family,
        engine,
        codecs,
    };
    let previous = rules
        .entry(input.to_string())
        .or_default()
        .insert(output.to_string(), rule);
    if previous.is_some() {
        return Err(Error::InvalidRegistry(format!(
            "duplicate conversion pair {} -> {}",
            input, output
        )));
    }

    if let Some(list) = outputs.get_mut(input) {
        list.push(output.to_string());
    }
    Ok(())
}
