// Per-court watermarks persisted between runs, so a restarted process (or a
// cron-driven `--once`) resumes where the last one stopped instead of
// recalibrating and skipping whatever was filed in between.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::debug;

use docketwatch_common::ConfigError;

pub type Watermarks = BTreeMap<String, DateTime<Utc>>;

pub struct Checkpoint {
    path: PathBuf,
}

impl Checkpoint {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file is a first run, not an error.
    pub fn load(&self) -> Result<Watermarks, ConfigError> {
        let shown = self.path.display().to_string();
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %shown, "No checkpoint yet");
                return Ok(Watermarks::new());
            }
            Err(source) => return Err(ConfigError::Read { path: shown, source }),
        };
        serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
            path: shown,
            message: e.to_string(),
        })
    }

    /// Written to a sibling file and renamed over the old one, so a crash
    /// mid-write leaves the previous checkpoint intact.
    pub fn save(&self, marks: &Watermarks) -> Result<(), ConfigError> {
        let shown = self.path.display().to_string();
        let json = serde_json::to_string_pretty(marks)
            .map_err(|e| ConfigError::Invalid(format!("unserializable checkpoint: {e}")))?;
        let staging = self.path.with_extension("tmp");
        std::fs::write(&staging, json)
            .and_then(|_| std::fs::rename(&staging, &self.path))
            .map_err(|source| ConfigError::Write { path: shown, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let checkpoint = Checkpoint::new(dir.path().join("state.json"));
        assert!(checkpoint.load().unwrap().is_empty());
    }

    #[test]
    fn saved_watermarks_load_back() {
        let dir = tempfile::tempdir().unwrap();
        let checkpoint = Checkpoint::new(dir.path().join("state.json"));
        let mut marks = Watermarks::new();
        marks.insert(
            "ilnd".to_string(),
            Utc.with_ymd_and_hms(2013, 10, 7, 12, 35, 0).unwrap(),
        );

        checkpoint.save(&marks).unwrap();

        assert_eq!(checkpoint.load().unwrap(), marks);
        assert!(!dir.path().join("state.tmp").exists());
    }

    #[test]
    fn corrupt_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            Checkpoint::new(path).load(),
            Err(ConfigError::Parse { .. })
        ));
    }
}
