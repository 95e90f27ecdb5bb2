//! Per-job artifact storage.
//!
//! Every job owns one directory named by its id under the data root.
//! Artifact file names are deterministic per kind, so no caller-supplied
//! path component ever reaches the filesystem.

use crate::error::{Result, SzinkronError};
use crate::ids::JobId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, warn};

/// The artifact kinds a job can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Transcript,
    Script,
    Translation,
    Audio,
    Video,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Transcript => "transcript",
            ArtifactKind::Script => "script",
            ArtifactKind::Translation => "translation",
            ArtifactKind::Audio => "audio",
            ArtifactKind::Video => "video",
        }
    }
}

impl std::str::FromStr for ArtifactKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "transcript" => Ok(ArtifactKind::Transcript),
            "script" => Ok(ArtifactKind::Script),
            "translation" => Ok(ArtifactKind::Translation),
            "audio" => Ok(ArtifactKind::Audio),
            "video" => Ok(ArtifactKind::Video),
            _ => Err(format!("Unknown artifact kind: {}", s)),
        }
    }
}

/// Artifact store rooted at the data directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// The job's artifact directory (created on demand).
    pub fn job_dir(&self, id: &JobId) -> PathBuf {
        self.root.join(id.as_str())
    }

    /// Deterministic artifact path for a kind. Language and extension only
    /// affect the translated/audio/video names.
    pub fn path_for(&self, id: &JobId, kind: ArtifactKind, language: &str, ext: &str) -> PathBuf {
        let name = match kind {
            ArtifactKind::Transcript => "transcript.txt".to_string(),
            ArtifactKind::Script => "script.txt".to_string(),
            ArtifactKind::Translation => format!("translated.{}.txt", language),
            ArtifactKind::Audio => format!("audio.{}.{}", language, ext),
            ArtifactKind::Video => format!("dubbed.{}.{}", language, ext),
        };
        self.job_dir(id).join(name)
    }

    /// Write a text artifact, creating the job directory if needed.
    pub async fn write_text(
        &self,
        id: &JobId,
        kind: ArtifactKind,
        language: &str,
        content: &str,
    ) -> Result<PathBuf> {
        let path = self.path_for(id, kind, language, "txt");
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, content).await?;
        debug!("Wrote {} artifact: {}", kind.as_str(), path.display());
        Ok(path)
    }

    /// Open an artifact for streaming: existence and size are checked.
    pub async fn open(&self, id: &JobId, path: &str) -> Result<(tokio::fs::File, u64)> {
        let resolved = PathBuf::from(path);
        // artifact paths are produced by this store; anything outside the
        // job directory means the record was tampered with
        if !resolved.starts_with(self.job_dir(id)) {
            return Err(SzinkronError::NotFound("Artifact outside job directory".into()));
        }

        let meta = tokio::fs::metadata(&resolved)
            .await
            .map_err(|_| SzinkronError::ArtifactNotReady(format!("Missing file: {}", path)))?;
        if meta.len() == 0 {
            return Err(SzinkronError::ArtifactNotReady("Artifact is empty".into()));
        }

        let file = tokio::fs::File::open(&resolved).await?;
        Ok((file, meta.len()))
    }

    /// Remove the job directory and everything in it.
    pub async fn delete_job_dir(&self, id: &JobId) {
        let dir = self.job_dir(id);
        if dir.exists() {
            if let Err(e) = tokio::fs::remove_dir_all(&dir).await {
                warn!("Failed to remove job dir {}: {}", dir.display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, ArtifactStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().to_path_buf());
        (dir, store)
    }

    #[test]
    fn test_deterministic_names() {
        let (_tmp, store) = store();
        let id = JobId::generate();
        assert!(store
            .path_for(&id, ArtifactKind::Transcript, "en-US", "txt")
            .ends_with(format!("{}/transcript.txt", id)));
        assert!(store
            .path_for(&id, ArtifactKind::Translation, "en-US", "txt")
            .ends_with(format!("{}/translated.en-US.txt", id)));
        assert!(store
            .path_for(&id, ArtifactKind::Audio, "en-US", "mp3")
            .ends_with(format!("{}/audio.en-US.mp3", id)));
        assert!(store
            .path_for(&id, ArtifactKind::Video, "en-US", "mp4")
            .ends_with(format!("{}/dubbed.en-US.mp4", id)));
    }

    #[tokio::test]
    async fn test_write_and_open() {
        let (_tmp, store) = store();
        let id = JobId::generate();
        let path = store
            .write_text(&id, ArtifactKind::Script, "hu-HU", "[0:00:00] szia")
            .await
            .unwrap();

        let (_file, size) = store.open(&id, path.to_str().unwrap()).await.unwrap();
        assert!(size > 0);
    }

    #[tokio::test]
    async fn test_open_missing_is_not_ready() {
        let (_tmp, store) = store();
        let id = JobId::generate();
        let path = store.path_for(&id, ArtifactKind::Script, "hu-HU", "txt");
        let err = store.open(&id, path.to_str().unwrap()).await.unwrap_err();
        assert!(matches!(err, SzinkronError::ArtifactNotReady(_)));
    }

    #[tokio::test]
    async fn test_open_rejects_foreign_path() {
        let (_tmp, store) = store();
        let id = JobId::generate();
        let err = store.open(&id, "/etc/passwd").await.unwrap_err();
        assert!(matches!(err, SzinkronError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_job_dir() {
        let (_tmp, store) = store();
        let id = JobId::generate();
        store
            .write_text(&id, ArtifactKind::Transcript, "hu-HU", "x")
            .await
            .unwrap();
        assert!(store.job_dir(&id).exists());
        store.delete_job_dir(&id).await;
        assert!(!store.job_dir(&id).exists());
    }
}
