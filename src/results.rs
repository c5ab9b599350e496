//! Result resolution: serving finished conversion artifacts.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use bytes::Bytes;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tokio_util::io::ReaderStream;
use tracing::debug;

use crate::jobs::{result_key, Token};
use crate::store::TtlStore;
use crate::{Error, Result};

/// A finished conversion artifact, opened and ready to be read.
#[derive(Debug)]
pub struct Artifact {
    /// File name the artifact is stored under.
    pub file_name: String,
    /// Size in bytes.
    pub size: u64,
    file: File,
}

impl Artifact {
    /// Stream the artifact in chunks.
    pub fn into_stream(self) -> ReaderStream<File> {
        ReaderStream::new(self.file)
    }

    /// Read the whole artifact into memory.
    pub async fn read_to_end(mut self) -> Result<Bytes> {
        let mut buf = Vec::with_capacity(self.size as usize);
        self.file.read_to_end(&mut buf).await?;
        Ok(Bytes::from(buf))
    }
}

/// Looks up and serves conversion results.
pub struct ResultResolver {
    store: Arc<dyn TtlStore>,
    retention: Duration,
}

impl ResultResolver {
    pub fn new(store: Arc<dyn TtlStore>, retention: Duration) -> Self {
        Self { store, retention }
    }

    /// Fetch the artifact for a token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when there is no live result record,
    /// the artifact file is gone, or the artifact has outlived the
    /// retention period. The caller cannot tell the cases apart.
    pub async fn fetch(&self, token: &Token) -> Result<Artifact> {
        let Some(path) = self.store.get(&result_key(token)).await? else {
            return Err(Error::NotFound);
        };
        let path = PathBuf::from(path);

        // Open before inspecting so the sweeper cannot delete the file
        // between the check and the read.
        let file = match File::open(&path).await {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(Error::NotFound),
            Err(e) => return Err(Error::Storage(e)),
        };

        let metadata = file.metadata().await?;
        // A record may outlive the file's retention window; the age check
        // is explicit rather than inferred from the record's presence.
        let age = metadata
            .modified()
            .ok()
            .and_then(|m| SystemTime::now().duration_since(m).ok())
            .unwrap_or_default();
        if age > self.retention {
            debug!(token = %token, age_secs = age.as_secs(), "artifact past retention, refusing");
            return Err(Error::NotFound);
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());

        Ok(Artifact {
            file_name,
            size: metadata.len(),
            file,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryTtlStore;
    use assert_matches::assert_matches;
    use futures::StreamExt;

    async fn seed_result(store: &MemoryTtlStore, token: &Token, path: &std::path::Path) {
        store
            .set(
                &result_key(token),
                path.to_string_lossy().into_owned(),
                Duration::from_secs(60),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_fetch_without_record() {
        let resolver = ResultResolver::new(
            Arc::new(MemoryTtlStore::new()),
            Duration::from_secs(3600),
        );
        let err = resolver.fetch(&Token::generate()).await.unwrap_err();
        assert_matches!(err, Error::NotFound);
    }

    #[tokio::test]
    async fn test_fetch_with_record_but_missing_file() {
        let store = MemoryTtlStore::new();
        let token = Token::generate();
        seed_result(&store, &token, std::path::Path::new("/nonexistent/gone.jpeg")).await;

        let resolver = ResultResolver::new(Arc::new(store), Duration::from_secs(3600));
        let err = resolver.fetch(&token).await.unwrap_err();
        assert_matches!(err, Error::NotFound);
    }

    #[tokio::test]
    async fn test_fetch_reads_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abc12345.jpeg");
        std::fs::write(&path, b"jpeg bytes").unwrap();

        let store = MemoryTtlStore::new();
        let token = Token::generate();
        seed_result(&store, &token, &path).await;

        let resolver = ResultResolver::new(Arc::new(store), Duration::from_secs(3600));
        let artifact = resolver.fetch(&token).await.unwrap();

        assert_eq!(artifact.file_name, "abc12345.jpeg");
        assert_eq!(artifact.size, 10);
        assert_eq!(&artifact.read_to_end().await.unwrap()[..], b"jpeg bytes");
    }

    #[tokio::test]
    async fn test_fetch_streams_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        std::fs::write(&path, b"%PDF-1.7 content").unwrap();

        let store = MemoryTtlStore::new();
        let token = Token::generate();
        seed_result(&store, &token, &path).await;

        let resolver = ResultResolver::new(Arc::new(store), Duration::from_secs(3600));
        let mut stream = resolver.fetch(&token).await.unwrap().into_stream();

        let mut collected = Vec::new();
        while let Some(chunk) = stream.next().await {
            collected.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(collected, b"%PDF-1.7 content");
    }

    #[tokio::test]
    async fn test_fetch_refuses_artifact_past_retention() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stale.png");
        std::fs::write(&path, b"png").unwrap();

        let store = MemoryTtlStore::new();
        let token = Token::generate();
        seed_result(&store, &token, &path).await;

        // Zero retention: any measurable age is too old.
        let resolver = ResultResolver::new(Arc::new(store), Duration::ZERO);
        tokio::time::sleep(Duration::from_millis(50)).await;

        let err = resolver.fetch(&token).await.unwrap_err();
        assert_matches!(err, Error::NotFound);
        // The file itself is the sweeper's to reclaim, not ours.
        assert!(path.exists());
    }
}
