//! Prediction audit trail
//!
//! Append-only JSONL log of served predictions, one line per request,
//! with size-based file rotation. The serving path must never fail
//! because of the audit log: write errors are logged at warn level and
//! swallowed.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{Datelike, Timelike, Utc};
use parking_lot::Mutex;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::model::RiskLevel;

/// Maximum file size before rotation (50 MB)
const MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// Log file extension
const LOG_EXT: &str = ".jsonl";

/// Generate a transaction id: TXN-{timestamp}-{4 random digits}
pub fn generate_transaction_id() -> String {
    let suffix = rand::thread_rng().gen_range(1000..10_000);
    format!("TXN-{}-{}", Utc::now().format("%Y%m%d%H%M%S"), suffix)
}

/// One audit line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub transaction_id: String,
    pub timestamp: i64,
    pub model_version: String,
    pub prediction: u8,
    pub probability: f64,
    pub risk_level: RiskLevel,
    pub recommended_action: String,
    pub processing_time_ms: f64,
    pub drifted_features: Vec<String>,
    pub client: String,
}

struct AuditWriter {
    writer: BufWriter<File>,
    current_file: PathBuf,
    current_size: u64,
    base_dir: PathBuf,
}

impl AuditWriter {
    fn open_new_file(base_dir: &Path) -> std::io::Result<(PathBuf, File)> {
        let now = Utc::now();
        let filename = format!(
            "predictions_{}_{:02}_{:02}_{:02}{:02}{:02}{}",
            now.year(),
            now.month(),
            now.day(),
            now.hour(),
            now.minute(),
            now.second(),
            LOG_EXT
        );
        let file_path = base_dir.join(&filename);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&file_path)?;

        tracing::info!(path = %file_path.display(), "opened audit log");
        Ok((file_path, file))
    }

    fn write_line(&mut self, line: &str) -> std::io::Result<()> {
        let bytes = line.as_bytes();

        if self.current_size + bytes.len() as u64 > MAX_FILE_SIZE {
            self.rotate()?;
        }

        self.writer.write_all(bytes)?;
        self.writer.write_all(b"\n")?;
        self.current_size += bytes.len() as u64 + 1;

        // Flush per record so a crash loses at most the in-flight line
        self.writer.flush()
    }

    fn rotate(&mut self) -> std::io::Result<()> {
        self.writer.flush()?;

        let (new_path, new_file) = Self::open_new_file(&self.base_dir)?;
        tracing::info!(
            from = %self.current_file.display(),
            to = %new_path.display(),
            "rotated audit log"
        );

        self.writer = BufWriter::new(new_file);
        self.current_file = new_path;
        self.current_size = 0;
        Ok(())
    }
}

/// Thread-safe audit log handle shared through the app state
pub struct AuditLog {
    inner: Mutex<AuditWriter>,
    session_id: String,
    entries_written: AtomicU64,
}

impl AuditLog {
    pub fn open(base_dir: PathBuf) -> std::io::Result<Self> {
        std::fs::create_dir_all(&base_dir)?;
        let (current_file, file) = AuditWriter::open_new_file(&base_dir)?;

        Ok(Self {
            inner: Mutex::new(AuditWriter {
                writer: BufWriter::new(file),
                current_file,
                current_size: 0,
                base_dir,
            }),
            session_id: uuid::Uuid::new_v4().to_string(),
            entries_written: AtomicU64::new(0),
        })
    }

    /// Append one entry. Failures are warned and swallowed; the caller
    /// never sees them.
    pub fn record(&self, entry: &AuditEntry) {
        let line = match serde_json::to_string(entry) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize audit entry, dropping");
                return;
            }
        };

        if let Err(e) = self.inner.lock().write_line(&line) {
            tracing::warn!(
                error = %e,
                transaction_id = %entry.transaction_id,
                "failed to write audit entry, dropping"
            );
            return;
        }

        self.entries_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn entries_written(&self) -> u64 {
        self.entries_written.load(Ordering::Relaxed)
    }

    pub fn current_file(&self) -> PathBuf {
        self.inner.lock().current_file.clone()
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

/// Read all entries from an audit file (tooling and tests)
pub fn read_entries(path: &Path) -> std::io::Result<Vec<AuditEntry>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut entries = Vec::new();

    for line in reader.lines() {
        let line = line?;
        if !line.is_empty() {
            if let Ok(entry) = serde_json::from_str::<AuditEntry>(&line) {
                entries.push(entry);
            }
        }
    }

    Ok(entries)
}
