//! Audit Log v0.4.0
//!
//! Append-only JSONL store of confirmation verdicts. One flattened record
//! per line, written with a single `writeln!` followed by `sync_all`, so a
//! crash can at worst truncate the final line - prior entries are never
//! touched. The reader tolerates a torn trailing line by skipping anything
//! that does not parse.
//!
//! The external accuracy-review collaborator consumes `query_all()` together
//! with independently supplied reference transcripts; hark itself never
//! computes WER.

use crate::resolution::Verdict;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Audit store errors. Append failures must reach the operator; the verdict
/// stays in memory and can be retried.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("failed to open audit store {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to append audit record: {0}")]
    Append(#[source] std::io::Error),

    #[error("failed to encode audit record: {0}")]
    Encode(#[source] serde_json::Error),
}

/// One persisted verdict, flattened for external review tooling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: String,
    pub utterance: String,
    pub source: String,
    pub lexical_score: f64,
    pub lexical_call: Option<String>,
    pub semantic_intent: Option<String>,
    pub semantic_confidence: Option<f64>,
    pub rationale: String,
    pub final_call: Option<String>,
    pub approved: bool,
    /// ISO-8601 confirmation time.
    pub decided_at: DateTime<Utc>,
}

impl From<&Verdict> for AuditRecord {
    fn from(verdict: &Verdict) -> Self {
        let resolution = &verdict.resolution;
        Self {
            id: resolution.id.clone(),
            utterance: resolution.utterance.text.clone(),
            source: resolution.utterance.source.0.clone(),
            lexical_score: resolution.lexical.score,
            lexical_call: resolution.lexical.system_call.clone(),
            semantic_intent: resolution.semantic.as_ref().map(|s| s.intent.clone()),
            semantic_confidence: resolution.semantic.as_ref().map(|s| s.confidence),
            rationale: resolution.rationale.as_str().to_string(),
            final_call: resolution.final_call.clone(),
            approved: verdict.approved,
            decided_at: verdict.decided_at,
        }
    }
}

/// Append-only verdict store backed by one JSONL file.
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    /// Open (or create) the store at `path`, creating parent directories.
    pub fn open(path: &Path) -> Result<Self, AuditError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| AuditError::Open {
                path: path.display().to_string(),
                source: e,
            })?;
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Durably append one verdict. Never overwrites prior entries.
    pub fn append(&self, verdict: &Verdict) -> Result<(), AuditError> {
        let record = AuditRecord::from(verdict);
        let json = serde_json::to_string(&record).map_err(AuditError::Encode)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| AuditError::Open {
                path: self.path.display().to_string(),
                source: e,
            })?;

        // A crash mid-append can leave the file without a trailing newline;
        // terminate that torn line first so it cannot swallow this record.
        if !ends_with_newline(&self.path).map_err(AuditError::Append)? {
            writeln!(file).map_err(AuditError::Append)?;
        }

        writeln!(file, "{}", json).map_err(AuditError::Append)?;
        file.sync_all().map_err(AuditError::Append)?;

        tracing::debug!(id = %record.id, approved = record.approved, "audit record appended");
        Ok(())
    }

    /// Lazily iterate every record in append order. Each call returns a
    /// fresh iterator, so the sequence is restartable. Unparsable lines
    /// (a torn final line after a crash) are skipped.
    pub fn query_all(&self) -> Result<impl Iterator<Item = AuditRecord>, AuditError> {
        if !self.path.exists() {
            return Ok(Records::Empty);
        }
        let file = File::open(&self.path).map_err(|e| AuditError::Open {
            path: self.path.display().to_string(),
            source: e,
        })?;
        Ok(Records::Lines(BufReader::new(file).lines()))
    }
}

fn ends_with_newline(path: &Path) -> std::io::Result<bool> {
    use std::io::{Read, Seek, SeekFrom};

    let len = fs::metadata(path)?.len();
    if len == 0 {
        return Ok(true);
    }
    let mut file = File::open(path)?;
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

/// Lazy record iterator over the store file.
enum Records {
    Empty,
    Lines(std::io::Lines<BufReader<File>>),
}

impl Iterator for Records {
    type Item = AuditRecord;

    fn next(&mut self) -> Option<AuditRecord> {
        loop {
            match self {
                Records::Empty => return None,
                Records::Lines(lines) => match lines.next()? {
                    Ok(line) => {
                        if let Ok(record) = serde_json::from_str(&line) {
                            return Some(record);
                        }
                        // Torn or foreign line: skip, keep reading.
                    }
                    Err(_) => return None,
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexical::MatchResult;
    use crate::resolution::{AudioRef, Rationale, Resolution, Utterance};

    fn verdict(id: &str, approved: bool) -> Verdict {
        Verdict {
            resolution: Resolution {
                id: id.into(),
                utterance: Utterance::new("what's the weather today", AudioRef("a.mp3".into())),
                lexical: MatchResult {
                    system_call: Some("get_weather".into()),
                    score: 0.71,
                },
                semantic: None,
                final_call: Some("get_weather".into()),
                rationale: Rationale::LexicalOnly,
            },
            approved,
            decided_at: Utc::now(),
        }
    }

    #[test]
    fn test_append_and_query_all() {
        let dir = tempfile::tempdir().unwrap();
        let log = AuditLog::open(&dir.path().join("audit.jsonl")).unwrap();

        log.append(&verdict("r-1", true)).unwrap();
        log.append(&verdict("r-2", false)).unwrap();

        let records: Vec<_> = log.query_all().unwrap().collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "r-1");
        assert!(records[0].approved);
        assert_eq!(records[1].id, "r-2");
        assert!(!records[1].approved);
        assert_eq!(records[0].rationale, "lexical_only");
    }

    #[test]
    fn test_reopen_preserves_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");

        {
            let log = AuditLog::open(&path).unwrap();
            log.append(&verdict("r-1", true)).unwrap();
        }

        // Fresh handle, as after a process restart.
        let log = AuditLog::open(&path).unwrap();
        log.append(&verdict("r-2", true)).unwrap();

        let ids: Vec<_> = log.query_all().unwrap().map(|r| r.id).collect();
        assert_eq!(ids, vec!["r-1", "r-2"]);
    }

    #[test]
    fn test_query_all_is_restartable() {
        let dir = tempfile::tempdir().unwrap();
        let log = AuditLog::open(&dir.path().join("audit.jsonl")).unwrap();
        log.append(&verdict("r-1", true)).unwrap();

        let first: Vec<_> = log.query_all().unwrap().collect();
        let second: Vec<_> = log.query_all().unwrap().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_torn_trailing_line_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let log = AuditLog::open(&path).unwrap();
        log.append(&verdict("r-1", true)).unwrap();

        // Simulate a crash mid-append.
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        write!(file, "{{\"id\": \"r-2\", \"utter").unwrap();
        drop(file);

        let records: Vec<_> = log.query_all().unwrap().collect();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "r-1");

        // And the torn line does not block further appends.
        log.append(&verdict("r-3", false)).unwrap();
        let ids: Vec<_> = log.query_all().unwrap().map(|r| r.id).collect();
        assert!(ids.contains(&"r-1".to_string()));
        assert!(ids.contains(&"r-3".to_string()));
    }

    #[test]
    fn test_query_all_on_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let log = AuditLog::open(&dir.path().join("audit.jsonl")).unwrap();
        assert_eq!(log.query_all().unwrap().count(), 0);
    }
}
