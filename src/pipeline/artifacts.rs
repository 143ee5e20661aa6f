//! Artifact cache and skip controller.
//!
//! Every stage of the pipeline leaves a file behind. Whether a stage has to
//! run is derived purely from which files exist; there is no separate status
//! record to drift out of sync with the tree.
//!
//! ```text
//! <out>/xml/<base>.xml                       RawMarkup
//! <out>/text/<base>_title.txt                ExtractedTitle
//! <out>/text/<base>_body.txt                 ExtractedBody
//! <out>/text/<base>_references.txt           ExtractedReferences
//! <out>/text/<base>_body_translated.txt      TranslatedBody
//! <out>/{docx|txt}/<base>_translated.{ext}   FinalOutput
//! ```
//!
//! ## Precedence
//!
//! The latest completed stage wins and everything before it is trusted as
//! is. [`ArtifactPaths::plan`] walks the stages from last to first and
//! returns the first [`ResumePoint`] whose inputs are all on disk.
//!
//! ## Atomic writes
//!
//! Artifacts are written to a sibling `*.tmp` file and renamed into place,
//! so an interrupted run never leaves a half-written file that a later run
//! would take for a completed stage.

use crate::config::OutputFormat;
use crate::error::{ItemError, PipelineError};
use std::path::{Path, PathBuf};
use tracing::debug;

/// One persisted intermediate or final output of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    RawMarkup,
    ExtractedTitle,
    ExtractedBody,
    ExtractedReferences,
    TranslatedBody,
    FinalOutput,
}

/// Where processing of a document has to (re)start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumePoint {
    /// Final output exists: nothing to do.
    Complete,
    /// Translated body exists: translate the title and assemble.
    Assemble,
    /// Extracted text exists: translate and assemble.
    Translate,
    /// Raw markup exists: parse, translate and assemble.
    Parse,
    /// Nothing usable on disk: run every stage.
    Extract,
}

/// The stage directory tree under one output root.
#[derive(Debug, Clone)]
pub struct ArtifactLayout {
    root: PathBuf,
    format: OutputFormat,
}

impl ArtifactLayout {
    pub fn new(root: impl Into<PathBuf>, format: OutputFormat) -> Self {
        Self {
            root: root.into(),
            format,
        }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn markup_dir(&self) -> PathBuf {
        self.root.join("xml")
    }

    pub fn text_dir(&self) -> PathBuf {
        self.root.join("text")
    }

    pub fn final_dir(&self) -> PathBuf {
        self.root.join(self.format.dir_name())
    }

    /// Create every stage directory.
    pub fn ensure_dirs(&self) -> Result<(), PipelineError> {
        for dir in [self.markup_dir(), self.text_dir(), self.final_dir()] {
            std::fs::create_dir_all(&dir).map_err(|source| PipelineError::OutputDirFailed {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(())
    }

    /// Artifact paths for the document with the given base name.
    pub fn paths_for(&self, base: &str) -> ArtifactPaths {
        let text = self.text_dir();
        ArtifactPaths {
            raw_markup: self.markup_dir().join(format!("{base}.xml")),
            title: text.join(format!("{base}_title.txt")),
            body: text.join(format!("{base}_body.txt")),
            references: text.join(format!("{base}_references.txt")),
            translated_body: text.join(format!("{base}_body_translated.txt")),
            final_output: self
                .final_dir()
                .join(format!("{base}_translated.{}", self.format.extension())),
        }
    }
}

/// Deterministic artifact paths of one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub raw_markup: PathBuf,
    pub title: PathBuf,
    pub body: PathBuf,
    pub references: PathBuf,
    pub translated_body: PathBuf,
    pub final_output: PathBuf,
}

impl ArtifactPaths {
    pub fn path(&self, kind: ArtifactKind) -> &Path {
        match kind {
            ArtifactKind::RawMarkup => &self.raw_markup,
            ArtifactKind::ExtractedTitle => &self.title,
            ArtifactKind::ExtractedBody => &self.body,
            ArtifactKind::ExtractedReferences => &self.references,
            ArtifactKind::TranslatedBody => &self.translated_body,
            ArtifactKind::FinalOutput => &self.final_output,
        }
    }

    pub async fn exists(&self, kind: ArtifactKind) -> bool {
        tokio::fs::try_exists(self.path(kind)).await.unwrap_or(false)
    }

    async fn all_exist(&self, kinds: &[ArtifactKind]) -> bool {
        for &kind in kinds {
            if !self.exists(kind).await {
                return false;
            }
        }
        true
    }

    /// Decide where processing must start, latest completed stage first.
    pub async fn plan(&self) -> ResumePoint {
        use ArtifactKind::*;

        let point = if self.exists(FinalOutput).await {
            ResumePoint::Complete
        } else if self
            .all_exist(&[TranslatedBody, ExtractedTitle, ExtractedReferences])
            .await
        {
            ResumePoint::Assemble
        } else if self
            .all_exist(&[ExtractedTitle, ExtractedBody, ExtractedReferences])
            .await
        {
            ResumePoint::Translate
        } else if self.exists(RawMarkup).await {
            ResumePoint::Parse
        } else {
            ResumePoint::Extract
        };
        debug!("Resume plan for {}: {:?}", self.final_output.display(), point);
        point
    }

    pub async fn read(&self, kind: ArtifactKind) -> Result<String, ItemError> {
        let path = self.path(kind);
        tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ItemError::ArtifactRead {
                path: path.to_path_buf(),
                source,
            })
    }

    pub async fn write(&self, kind: ArtifactKind, contents: &[u8]) -> Result<(), ItemError> {
        write_atomic(self.path(kind), contents).await
    }

    /// Reference entries, one per line.
    pub async fn read_references(&self) -> Result<Vec<String>, ItemError> {
        let raw = self.read(ArtifactKind::ExtractedReferences).await?;
        Ok(raw
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(str::to_string)
            .collect())
    }

    pub async fn write_references(&self, references: &[String]) -> Result<(), ItemError> {
        self.write(ArtifactKind::ExtractedReferences, references.join("\n").as_bytes())
            .await
    }
}

/// Write `contents` to `path` via a temp file and rename.
pub async fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), ItemError> {
    let failed = |source| ItemError::ArtifactWrite {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(failed)?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, contents).await.map_err(failed)?;
    tokio::fs::rename(&tmp, path).await.map_err(failed)?;
    debug!("Wrote {} ({} bytes)", path.display(), contents.len());
    Ok(())
}
