//! Append-only JSONL audit trail.
//!
//! Every pipeline operation leaves a timestamped event so transformations
//! stay traceable after the fact. Events carry sanitized payloads only:
//! failure events record the offending raw value and failure kind, never
//! internal error detail.

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub timestamp: String,
    pub event_type: String,
    pub data: Value,
}

/// Writes audit events to a JSONL file, one event per line.
#[derive(Debug, Clone)]
pub struct AuditLogger {
    path: PathBuf,
}

impl AuditLogger {
    /// Create the logger, its parent directories, and an empty log file
    /// if none exists yet.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("opening {}", path.display()))?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one event.
    pub fn log_event(&self, event_type: &str, data: Value) -> Result<()> {
        let event = AuditEvent {
            timestamp: Utc::now().to_rfc3339(),
            event_type: event_type.to_string(),
            data,
        };
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .with_context(|| format!("opening {}", self.path.display()))?;
        let line = serde_json::to_string(&event)?;
        writeln!(file, "{line}").with_context(|| format!("writing {}", self.path.display()))?;
        Ok(())
    }

    /// Read back events, optionally filtered by type.
    pub fn events(&self, event_type: Option<&str>) -> Result<Vec<AuditEvent>> {
        let file = std::fs::File::open(&self.path)
            .with_context(|| format!("opening {}", self.path.display()))?;
        let mut events = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let event: AuditEvent = serde_json::from_str(&line)
                .with_context(|| format!("malformed audit line in {}", self.path.display()))?;
            if event_type.is_none_or(|t| event.event_type == t) {
                events.push(event);
            }
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_creates_file_and_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs/audit.jsonl");
        let logger = AuditLogger::new(&path).unwrap();
        assert!(path.exists());
        assert!(logger.events(None).unwrap().is_empty());
    }

    #[test]
    fn test_log_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let logger = AuditLogger::new(dir.path().join("audit.jsonl")).unwrap();

        logger
            .log_event("parse_started", json!({"input": "a.csv"}))
            .unwrap();
        logger
            .log_event(
                "parse_error",
                json!({"row": 4, "field": "date", "value": "not a date"}),
            )
            .unwrap();

        let all = logger.events(None).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].event_type, "parse_started");
        assert_eq!(all[1].data["row"], 4);
    }

    #[test]
    fn test_filter_by_event_type() {
        let dir = tempfile::tempdir().unwrap();
        let logger = AuditLogger::new(dir.path().join("audit.jsonl")).unwrap();
        logger.log_event("a", json!({})).unwrap();
        logger.log_event("b", json!({})).unwrap();
        logger.log_event("a", json!({})).unwrap();

        assert_eq!(logger.events(Some("a")).unwrap().len(), 2);
        assert_eq!(logger.events(Some("b")).unwrap().len(), 1);
        assert_eq!(logger.events(Some("c")).unwrap().len(), 0);
    }

    #[test]
    fn test_appends_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        AuditLogger::new(&path)
            .unwrap()
            .log_event("first", json!({}))
            .unwrap();
        AuditLogger::new(&path)
            .unwrap()
            .log_event("second", json!({}))
            .unwrap();
        let events = AuditLogger::new(&path).unwrap().events(None).unwrap();
        assert_eq!(events.len(), 2);
    }
}
