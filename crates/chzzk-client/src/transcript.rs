//! Transcript sinks.
//!
//! The transcript is the product of a run, not a diagnostic, so it never
//! goes through `tracing`. Every record becomes one rendered line in the
//! sink and is flushed immediately so the file can be tailed.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Local, Utc};
use chzzk_core::{Labels, LogRecord};
use parking_lot::Mutex;

/// Append-only destination for log records.
pub trait TranscriptSink: Send {
    /// Write one record. Must be durable (flushed) when this returns `Ok`.
    fn write_record(&mut self, record: &LogRecord) -> io::Result<()>;
}

/// Transcript file, rendered in local time, optionally echoed to stdout.
pub struct FileTranscript {
    path: PathBuf,
    file: File,
    labels: Labels,
    echo: bool,
}

impl FileTranscript {
    /// Open (creating if needed) the transcript file.
    ///
    /// With `append` unset an existing file is truncated.
    pub fn open(path: &Path, append: bool, echo: bool, labels: Labels) -> io::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(append)
            .truncate(!append)
            .open(path)?;
        tracing::debug!(?path, append, "transcript opened");
        Ok(Self {
            path: path.to_path_buf(),
            file,
            labels,
            echo,
        })
    }

    /// Path of the transcript file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TranscriptSink for FileTranscript {
    fn write_record(&mut self, record: &LogRecord) -> io::Result<()> {
        let line = record.render(&self.labels, &Local);
        writeln!(self.file, "{line}")?;
        self.file.flush()?;
        if self.echo {
            let mut out = io::stdout().lock();
            let _ = writeln!(out, "{line}");
        }
        Ok(())
    }
}

/// In-memory sink. Clones share the same buffer, so a test can keep one
/// handle while the dispatcher owns another.
#[derive(Clone, Default)]
pub struct MemoryTranscript {
    records: Arc<Mutex<Vec<LogRecord>>>,
    labels: Labels,
}

impl MemoryTranscript {
    /// Empty sink rendering with `labels`.
    pub fn new(labels: Labels) -> Self {
        Self {
            records: Arc::default(),
            labels,
        }
    }

    /// Records written so far.
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    /// Records rendered as lines, in UTC.
    pub fn lines(&self) -> Vec<String> {
        self.records
            .lock()
            .iter()
            .map(|r| r.render(&self.labels, &Utc))
            .collect()
    }
}

impl TranscriptSink for MemoryTranscript {
    fn write_record(&mut self, record: &LogRecord) -> io::Result<()> {
        self.records.lock().push(record.clone());
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeDelta};
    use chzzk_core::{ChatCategory, Locale};

    fn record(message: &str) -> LogRecord {
        LogRecord {
            sent_at: DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap(),
            elapsed: TimeDelta::seconds(5),
            category: ChatCategory::Chat,
            nickname: "Alice".into(),
            message: message.into(),
        }
    }

    fn read(path: &Path) -> Vec<String> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(str::to_owned)
            .collect()
    }

    #[test]
    fn file_transcript_writes_one_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.txt");
        let mut sink = FileTranscript::open(&path, true, false, Labels::default()).unwrap();

        sink.write_record(&record("hello")).unwrap();
        sink.write_record(&record("world")).unwrap();

        let lines = read(&path);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("(+0:00:05)][채팅] Alice : hello"));
        assert!(lines[1].ends_with("Alice : world"));
    }

    #[test]
    fn file_transcript_is_readable_before_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.txt");
        let mut sink = FileTranscript::open(&path, true, false, Labels::default()).unwrap();

        sink.write_record(&record("tail me")).unwrap();
        assert_eq!(read(&path).len(), 1);
        drop(sink);
    }

    #[test]
    fn append_mode_keeps_existing_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.txt");
        std::fs::write(&path, "earlier\n").unwrap();

        let mut sink = FileTranscript::open(&path, true, false, Labels::default()).unwrap();
        sink.write_record(&record("later")).unwrap();

        let lines = read(&path);
        assert_eq!(lines[0], "earlier");
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn truncate_mode_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.txt");
        std::fs::write(&path, "earlier\n").unwrap();

        let mut sink = FileTranscript::open(&path, false, false, Labels::default()).unwrap();
        sink.write_record(&record("only")).unwrap();

        let lines = read(&path);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with("Alice : only"));
    }

    #[test]
    fn open_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("chat.txt");
        let sink = FileTranscript::open(&path, true, false, Labels::default()).unwrap();
        assert_eq!(sink.path(), path);
        assert!(path.exists());
    }

    #[test]
    fn memory_transcript_shares_buffer() {
        let handle = MemoryTranscript::new(Labels::for_locale(Locale::En));
        let mut sink = handle.clone();
        sink.write_record(&record("hi")).unwrap();

        assert_eq!(handle.records().len(), 1);
        assert_eq!(
            handle.lines(),
            vec!["[2023-11-14 22:13:20 (+0:00:05)][chat] Alice : hi".to_string()]
        );
    }
}
