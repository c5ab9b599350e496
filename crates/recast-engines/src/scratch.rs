//! Scratch directory management for converter invocations.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use tempfile::TempDir;

use crate::{Error, Result};

/// Exclusively-owned scratch directory for one converter invocation.
///
/// The input bytes are materialized as `input.{input_format}` and the engine
/// is pointed at `output.{output_format}` inside the same directory. The
/// directory and everything in it are removed when the `Scratch` is dropped,
/// on every exit path.
pub struct Scratch {
    temp_dir: TempDir,
    input_path: PathBuf,
    output_path: PathBuf,
}

impl Scratch {
    /// Create a scratch directory and write the input bytes into it.
    pub async fn new(input: &[u8], input_format: &str, output_format: &str) -> Result<Self> {
        let temp_dir = TempDir::new().map_err(|e| Error::Scratch(e.to_string()))?;

        let input_path = temp_dir.path().join(format!("input.{}", input_format));
        let output_path = temp_dir.path().join(format!("output.{}", output_format));

        tokio::fs::write(&input_path, input).await?;

        Ok(Self {
            temp_dir,
            input_path,
            output_path,
        })
    }

    /// Path of the scratch directory itself.
    pub fn dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Path of the materialized input file.
    pub fn input(&self) -> &Path {
        &self.input_path
    }

    /// Path the engine is expected to write its output to.
    pub fn output(&self) -> &Path {
        &self.output_path
    }

    /// Path for an extra file inside the scratch directory.
    pub fn file(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    /// Read the produced output file.
    pub async fn read_output(&self) -> Result<Bytes> {
        self.read_file(&self.output_path).await
    }

    /// Read an arbitrary file from the scratch directory.
    pub async fn read_file(&self, path: &Path) -> Result<Bytes> {
        let data = tokio::fs::read(path).await?;
        Ok(Bytes::from(data))
    }
}
