use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Line types in the per-run session JSONL transcript.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionLine {
    SessionStart {
        timestamp: DateTime<Utc>,
        work_dir: PathBuf,
        provider: String,
        model: String,
        language: String,
        max_cycles: usize,
        max_attempts: usize,
    },
    Cycle {
        cycle_number: usize,
        tester: String,
        implementer: Option<String>,
        refactorer: Option<String>,
        timestamp: DateTime<Utc>,
    },
    SessionEnd {
        outcome: String,
        cycles: usize,
        duration_secs: f64,
        timestamp: DateTime<Utc>,
    },
}

/// Appends one JSONL transcript per run to
/// `<data_dir>/redgreen/sessions/<timestamp>_<hash>.jsonl`.
pub struct SessionWriter {
    file: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl SessionWriter {
    /// Create a transcript in the default sessions directory. The file name
    /// combines the UTC timestamp with a short hash of the kata rules so
    /// runs of the same kata cluster together.
    pub fn new(rules: &str) -> io::Result<Self> {
        Self::new_in(&Self::sessions_dir()?, rules)
    }

    /// Create a transcript in an explicit directory.
    pub fn new_in(sessions_dir: &Path, rules: &str) -> io::Result<Self> {
        fs::create_dir_all(sessions_dir)?;

        let now = Utc::now();
        let timestamp_str = now.format("%Y-%m-%dT%H-%M-%SZ").to_string();

        let mut hasher = Sha256::new();
        hasher.update(rules.as_bytes());
        let hash = hex::encode(hasher.finalize());
        let short_hash = &hash[..6];

        let filename = format!("{}_{}.jsonl", timestamp_str, short_hash);
        let path = sessions_dir.join(filename);

        let file = File::create(&path)?;
        let writer = BufWriter::new(file);

        Ok(Self {
            file: Mutex::new(writer),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write_start(
        &self,
        work_dir: &Path,
        provider: &str,
        model: &str,
        language: &str,
        max_cycles: usize,
        max_attempts: usize,
    ) {
        self.write_line(&SessionLine::SessionStart {
            timestamp: Utc::now(),
            work_dir: work_dir.to_path_buf(),
            provider: provider.to_string(),
            model: model.to_string(),
            language: language.to_string(),
            max_cycles,
            max_attempts,
        });
    }

    /// Record one cycle. Accepts individual fields rather than the core's
    /// record type to avoid a circular crate dependency.
    pub fn write_cycle(
        &self,
        cycle_number: usize,
        tester: &str,
        implementer: Option<&str>,
        refactorer: Option<&str>,
        timestamp: DateTime<Utc>,
    ) {
        self.write_line(&SessionLine::Cycle {
            cycle_number,
            tester: tester.to_string(),
            implementer: implementer.map(String::from),
            refactorer: refactorer.map(String::from),
            timestamp,
        });
    }

    pub fn write_end(&self, outcome: &str, cycles: usize, duration_secs: f64) {
        self.write_line(&SessionLine::SessionEnd {
            outcome: outcome.to_string(),
            cycles,
            duration_secs,
            timestamp: Utc::now(),
        });
    }

    fn write_line(&self, line: &SessionLine) {
        if let Ok(json) = serde_json::to_string(line) {
            if let Ok(mut writer) = self.file.lock() {
                let _ = writeln!(writer, "{}", json);
                let _ = writer.flush();
            }
        }
    }

    fn sessions_dir() -> io::Result<PathBuf> {
        let data_dir = dirs::data_dir().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "could not determine data directory")
        })?;
        Ok(data_dir.join("redgreen").join("sessions"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn writes_full_transcript() {
        let tmp = TempDir::new().unwrap();
        let writer = SessionWriter::new_in(tmp.path(), "double the input").unwrap();

        writer.write_start(Path::new("/tmp/kata"), "openai", "gpt-4.1-mini", "rust", 5, 5);
        writer.write_cycle(1, "red", Some("green"), Some("skipped"), Utc::now());
        writer.write_end("completed", 1, 42.0);

        let content = std::fs::read_to_string(writer.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains(r#""type":"session_start""#));
        assert!(lines[1].contains(r#""cycle_number":1"#));
        assert!(lines[2].contains(r#""outcome":"completed""#));
    }

    #[test]
    fn file_name_carries_rules_hash() {
        let tmp = TempDir::new().unwrap();
        let a = SessionWriter::new_in(tmp.path(), "kata a").unwrap();
        let name = a.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.ends_with(".jsonl"));
        // timestamp, underscore, six hex chars
        let stem = name.trim_end_matches(".jsonl");
        let (_, hash) = stem.rsplit_once('_').unwrap();
        assert_eq!(hash.len(), 6);
    }
}
