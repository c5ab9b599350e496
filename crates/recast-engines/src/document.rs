//! Document conversion via pandoc and libreoffice.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::process::Command;
use tracing::debug;

use crate::exec::run_engine;
use crate::scratch::Scratch;
use crate::types::{ConversionRequest, Engine, EngineConfig, MediaFamily};
use crate::{Converter, Error, Result};

/// Converter for text and office document formats.
///
/// The conversion rule selects the engine per pair: pandoc for markup
/// transformations, libreoffice for office formats and PDF rendering.
/// Each invocation gets its own scratch directory, removed on every exit
/// path.
pub struct DocumentConverter {
    config: EngineConfig,
}

impl DocumentConverter {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    async fn run_pandoc(&self, scratch: &Scratch, request: &ConversionRequest) -> Result<Bytes> {
        let mut cmd = Command::new(&self.config.pandoc_path);
        cmd.args(pandoc_args(
            scratch.input(),
            scratch.output(),
            &request.input_format,
            &request.output_format,
        ));

        run_engine(cmd, "pandoc", self.config.timeout()).await?;

        if !scratch.output().exists() {
            return Err(Error::bad_output("pandoc", "no output file produced"));
        }
        scratch.read_output().await
    }

    async fn run_libreoffice(
        &self,
        scratch: &Scratch,
        request: &ConversionRequest,
    ) -> Result<Bytes> {
        let mut cmd = Command::new(&self.config.libreoffice_path);
        cmd.args(libreoffice_args(
            scratch.input(),
            scratch.dir(),
            &request.output_format,
        ));

        run_engine(cmd, "libreoffice", self.config.timeout()).await?;

        // libreoffice names the output after the input stem, so the produced
        // file has to be picked out of the scratch directory afterwards.
        let produced = select_output(scratch.dir(), &request.output_format, scratch.input())?;
        scratch.read_file(&produced).await
    }
}

#[async_trait]
impl Converter for DocumentConverter {
    fn family(&self) -> MediaFamily {
        MediaFamily::Document
    }

    async fn convert(&self, input: Bytes, request: &ConversionRequest) -> Result<Bytes> {
        let scratch =
            Scratch::new(&input, &request.input_format, &request.output_format).await?;
        debug!(
            input_format = %request.input_format,
            output_format = %request.output_format,
            engine = %request.engine,
            "converting document"
        );

        match request.engine {
            Engine::Pandoc => self.run_pandoc(&scratch, request).await,
            Engine::LibreOffice => self.run_libreoffice(&scratch, request).await,
            other => Err(Error::unsupported(format!(
                "document conversion via {}",
                other
            ))),
        }
    }
}

fn pandoc_args(input: &Path, output: &Path, from: &str, to: &str) -> Vec<String> {
    vec![
        "--from".to_string(),
        from.to_string(),
        "--to".to_string(),
        to.to_string(),
        "--output".to_string(),
        output.to_string_lossy().into_owned(),
        input.to_string_lossy().into_owned(),
    ]
}

fn libreoffice_args(input: &Path, outdir: &Path, to: &str) -> Vec<String> {
    vec![
        "--headless".to_string(),
        "--convert-to".to_string(),
        to.to_string(),
        "--outdir".to_string(),
        outdir.to_string_lossy().into_owned(),
        input.to_string_lossy().into_owned(),
    ]
}

/// Pick the file libreoffice produced.
///
/// Exactly one file with the target extension (other than the input) must
/// be present; zero or several is a failed invocation, not a guess.
fn select_output(dir: &Path, output_format: &str, exclude: &Path) -> Result<PathBuf> {
    let suffix = format!(".{}", output_format);
    let mut candidates = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path == exclude {
            continue;
        }
        let matches = path
            .file_name()
            .map(|n| n.to_string_lossy().ends_with(&suffix))
            .unwrap_or(false);
        if matches {
            candidates.push(path);
        }
    }

    match candidates.len() {
        1 => Ok(candidates.remove(0)),
        0 => Err(Error::bad_output(
            "libreoffice",
            format!("no '{}' file produced", suffix),
        )),
        n => Err(Error::bad_output(
            "libreoffice",
            format!("{} candidate '{}' files produced", n, suffix),
        )),
    }
}
