//! Pregenerated-summary artifacts for the multi-document path.
//!
//! When a meta-conversation is created, each input document contributes a
//! read-only artifact produced by a prior single-document run:
//! `{summary: [{text, sources}], source: [{id, text}]}`. The aggregator
//! seeds a child conversation from it instead of calling the model fresh.
//! Artifacts are never written by this crate.

use super::records::RawSummaryBlock;
use crate::document::SourceEntry;
use crate::error::{SumciteError, SumciteResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// A pregenerated per-document summary.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SummaryArtifact {
    pub summary: Vec<RawSummaryBlock>,
    pub source: Vec<SourceEntry>,
}

/// Read-only lookup of pregenerated summaries by document ID.
pub trait ArtifactSource: Send + Sync {
    fn load(&self, document_id: &str) -> SumciteResult<SummaryArtifact>;
}

/// File-backed artifact source: `{root}/{document_id}.json`.
pub struct FileArtifactSource {
    root: PathBuf,
}

impl FileArtifactSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ArtifactSource for FileArtifactSource {
    fn load(&self, document_id: &str) -> SumciteResult<SummaryArtifact> {
        if document_id.contains('/') || document_id.contains("..") {
            return Err(SumciteError::Artifact(format!(
                "invalid document id: {document_id}"
            )));
        }
        let path = self.root.join(format!("{document_id}.json"));
        let raw = std::fs::read_to_string(&path).map_err(|e| {
            SumciteError::Artifact(format!(
                "failed to read artifact for {document_id} at {}: {e}",
                path.display()
            ))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            SumciteError::Artifact(format!("malformed artifact for {document_id}: {e}"))
        })
    }
}

/// In-memory artifact source for tests and demos.
#[derive(Default)]
pub struct MemoryArtifactSource {
    artifacts: HashMap<String, SummaryArtifact>,
}

impl MemoryArtifactSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(mut self, document_id: impl Into<String>, artifact: SummaryArtifact) -> Self {
        self.artifacts.insert(document_id.into(), artifact);
        self
    }
}

impl ArtifactSource for MemoryArtifactSource {
    fn load(&self, document_id: &str) -> SumciteResult<SummaryArtifact> {
        self.artifacts
            .get(document_id)
            .cloned()
            .ok_or_else(|| {
                SumciteError::Artifact(format!("no pregenerated summary for {document_id}"))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_artifact() -> SummaryArtifact {
        SummaryArtifact {
            summary: vec![RawSummaryBlock {
                text: "The report covers revenue.".into(),
                sources: vec!["S3".into()],
            }],
            source: vec![
                SourceEntry {
                    id: "S1".into(),
                    text: "Annual Review".into(),
                },
                SourceEntry {
                    id: "S3".into(),
                    text: "Revenue grew.".into(),
                },
            ],
        }
    }

    #[test]
    fn file_artifact_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = sample_artifact();
        std::fs::write(
            dir.path().join("d1.json"),
            serde_json::to_string(&artifact).unwrap(),
        )
        .unwrap();

        let source = FileArtifactSource::new(dir.path());
        assert_eq!(source.load("d1").unwrap(), artifact);
    }

    #[test]
    fn missing_artifact_errors() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileArtifactSource::new(dir.path());
        assert!(matches!(
            source.load("absent"),
            Err(SumciteError::Artifact(_))
        ));
    }

    #[test]
    fn malformed_artifact_errors() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.json"), "{\"summary\": 7}").unwrap();
        let source = FileArtifactSource::new(dir.path());
        assert!(matches!(source.load("bad"), Err(SumciteError::Artifact(_))));
    }

    #[test]
    fn memory_artifact_lookup() {
        let source = MemoryArtifactSource::new().insert("d1", sample_artifact());
        assert!(source.load("d1").is_ok());
        assert!(source.load("d2").is_err());
    }
}
