pub mod deck;
pub mod pptx;

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;

use crate::generator::WordContent;

pub use pptx::PPTX_CONTENT_TYPE;

#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("Failed to write presentation: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to package presentation: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Failed to write slide XML: {0}")]
    Xml(#[from] quick_xml::Error),
}

/// A stored deck and the URL it is served from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub filename: String,
    pub download_url: String,
}

/// Turns generated content into a downloadable file
#[async_trait]
pub trait ArtifactBuilder: Send + Sync {
    async fn build(&self, job_id: Uuid, content: &WordContent) -> Result<Artifact, ArtifactError>;
}

/// Render the slide deck for one word into `.pptx` bytes
pub fn render_word_deck(content: &WordContent) -> Result<Vec<u8>, ArtifactError> {
    let slides = deck::plan_slides(content);
    pptx::render(&content.word, &slides)
}

/// Keep letters, digits and spaces; spaces become underscores so the
/// name can sit in a URL path unescaped
pub fn safe_file_stem(word: &str) -> String {
    let kept: String = word
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ')
        .collect();
    let stem = kept.trim().replace(' ', "_");
    if stem.is_empty() {
        "deck".to_string()
    } else {
        stem
    }
}

/// Writes decks under `<root>/<job_id>/` and serves them from
/// `/api/download/<job_id>/<filename>`
#[derive(Debug, Clone)]
pub struct FileArtifactBuilder {
    root: PathBuf,
}

impl FileArtifactBuilder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of a stored file. `None` for names that could escape the job directory.
    pub fn resolve(&self, job_id: Uuid, filename: &str) -> Option<PathBuf> {
        let valid = !filename.is_empty()
            && !filename.starts_with('.')
            && !filename.contains(['/', '\\'])
            && !filename.contains("..");
        valid.then(|| self.root.join(job_id.to_string()).join(filename))
    }
}

#[async_trait]
impl ArtifactBuilder for FileArtifactBuilder {
    async fn build(&self, job_id: Uuid, content: &WordContent) -> Result<Artifact, ArtifactError> {
        let bytes = render_word_deck(content)?;

        let dir = self.root.join(job_id.to_string());
        fs::create_dir_all(&dir).await?;

        // Different words can share a stem once sanitized ("cat" / "cat!")
        let stem = safe_file_stem(&content.word);
        let mut attempt = 1;
        loop {
            let filename = if attempt == 1 {
                format!("{stem}.pptx")
            } else {
                format!("{stem}_{attempt}.pptx")
            };
            let path = dir.join(&filename);

            match fs::OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(mut file) => {
                    file.write_all(&bytes).await?;
                    file.flush().await?;
                    debug!("Wrote {} ({} bytes)", path.display(), bytes.len());
                    return Ok(Artifact {
                        download_url: format!("/api/download/{job_id}/{filename}"),
                        filename,
                    });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn content(word: &str) -> WordContent {
        WordContent {
            word: word.to_string(),
            definition: "d".to_string(),
            sentence: "s".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn file_stems_are_url_safe() {
        assert_eq!(safe_file_stem("ice cream!"), "ice_cream");
        assert_eq!(safe_file_stem("café"), "café");
        assert_eq!(safe_file_stem("../../etc"), "etc");
        assert_eq!(safe_file_stem("?!"), "deck");
    }

    #[test]
    fn resolve_rejects_traversal() {
        let builder = FileArtifactBuilder::new("/tmp/decks");
        let job = Uuid::new_v4();
        assert!(builder.resolve(job, "cat.pptx").is_some());
        assert!(builder.resolve(job, "../secret").is_none());
        assert!(builder.resolve(job, "a/b.pptx").is_none());
        assert!(builder.resolve(job, ".hidden").is_none());
        assert!(builder.resolve(job, "").is_none());
    }

    #[tokio::test]
    async fn build_writes_file_and_returns_download_url() {
        let dir = TempDir::new().unwrap();
        let builder = FileArtifactBuilder::new(dir.path());
        let job = Uuid::new_v4();

        let artifact = builder.build(job, &content("cat")).await.unwrap();
        assert_eq!(artifact.filename, "cat.pptx");
        assert_eq!(artifact.download_url, format!("/api/download/{job}/cat.pptx"));

        let path = builder.resolve(job, &artifact.filename).unwrap();
        let bytes = std::fs::read(path).unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }

    #[tokio::test]
    async fn colliding_stems_get_numbered() {
        let dir = TempDir::new().unwrap();
        let builder = FileArtifactBuilder::new(dir.path());
        let job = Uuid::new_v4();

        let first = builder.build(job, &content("cat")).await.unwrap();
        let second = builder.build(job, &content("cat!")).await.unwrap();
        assert_eq!(first.filename, "cat.pptx");
        assert_eq!(second.filename, "cat_2.pptx");
    }
}
