//! Persists the run document and per-page diagnostic snapshots.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, instrument};

use super::run::ScrapeRun;

/// Default output directory.
pub const DEFAULT_OUTPUT_DIR: &str = "Results";

/// Default output file name.
pub const DEFAULT_OUTPUT_FILE: &str = "pima_all_pages_complete.json";

/// Errors produced while writing run output.
#[derive(Debug, Error)]
pub enum OutputError {
    /// I/O error creating or writing an output file.
    #[error("I/O error writing {path}: {source}")]
    Io {
        /// The file or directory involved.
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// JSON serialization error (shouldn't occur for well-formed structs).
    #[error("JSON serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl OutputError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Writes run output under one directory.
#[derive(Debug, Clone)]
pub struct RunWriter {
    dir: PathBuf,
    file_name: String,
}

impl Default for RunWriter {
    fn default() -> Self {
        Self::new(DEFAULT_OUTPUT_DIR, DEFAULT_OUTPUT_FILE)
    }
}

impl RunWriter {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, file_name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            file_name: file_name.into(),
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where [`write_run`](Self::write_run) puts the run document.
    #[must_use]
    pub fn output_path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }

    /// Path of the snapshot for `page`.
    #[must_use]
    pub fn snapshot_path(&self, page: u32) -> PathBuf {
        self.dir.join(format!("debug_page_{page}.html"))
    }

    /// Writes `run` as pretty-printed JSON.
    ///
    /// The document is written to a sibling temporary file and renamed into
    /// place, so readers never see a half-written file and repeated calls
    /// simply replace the previous version.
    ///
    /// # Errors
    ///
    /// Returns [`OutputError`] if the directory cannot be created or the file
    /// cannot be written or renamed.
    #[instrument(skip(self, run), fields(records = run.total_records, status = ?run.status))]
    pub fn write_run(&self, run: &ScrapeRun) -> Result<PathBuf, OutputError> {
        fs::create_dir_all(&self.dir).map_err(|e| OutputError::io(&self.dir, e))?;

        let path = self.output_path();
        let temp_path = self.dir.join(format!(".{}.partial", self.file_name));

        let file = fs::File::create(&temp_path).map_err(|e| OutputError::io(&temp_path, e))?;
        let write_result = {
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, run)
                .map_err(OutputError::from)
                .and_then(|()| writer.flush().map_err(|e| OutputError::io(&temp_path, e)))
        };
        if let Err(err) = write_result {
            let _ = fs::remove_file(&temp_path);
            return Err(err);
        }

        fs::rename(&temp_path, &path).map_err(|e| OutputError::io(&path, e))?;

        let bytes = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        info!(path = %path.display(), bytes, "results saved");
        Ok(path)
    }

    /// Saves raw page markup for offline inspection.
    ///
    /// # Errors
    ///
    /// Returns [`OutputError::Io`] if the file cannot be written.
    pub fn write_snapshot(&self, page: u32, markup: &str) -> Result<PathBuf, OutputError> {
        fs::create_dir_all(&self.dir).map_err(|e| OutputError::io(&self.dir, e))?;
        let path = self.snapshot_path(page);
        fs::write(&path, markup).map_err(|e| OutputError::io(&path, e))?;
        debug!(path = %path.display(), "page snapshot saved");
        Ok(path)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;
    use tempfile::TempDir;

    use super::*;
    use crate::scrape::run::RunStatus;
    use crate::search::SearchCriteria;

    fn run() -> ScrapeRun {
        let criteria = SearchCriteria::parse("07/01/2025", "07/31/2025", &["NTSALE"]).unwrap();
        let mut run = ScrapeRun::new(&criteria, 1, Utc::now());
        run.record_page_success(Vec::new());
        run.finalize(RunStatus::Complete, Duration::from_secs(1));
        run
    }

    #[test]
    fn test_write_run_creates_directory_and_file() {
        let temp = TempDir::new().unwrap();
        let writer = RunWriter::new(temp.path().join("nested").join("out"), "run.json");

        let path = writer.write_run(&run()).unwrap();

        assert_eq!(path, writer.output_path());
        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["total_pages"], 1);
        assert_eq!(json["status"], "complete");
    }

    #[test]
    fn test_write_run_is_repeatable_and_leaves_no_temp_file() {
        let temp = TempDir::new().unwrap();
        let writer = RunWriter::new(temp.path(), "run.json");
        let mut run = run();

        writer.write_run(&run).unwrap();
        run.finalize(RunStatus::Interrupted, Duration::from_secs(2));
        writer.write_run(&run).unwrap();

        let entries: Vec<String> = fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(entries, vec!["run.json".to_string()]);

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(writer.output_path()).unwrap()).unwrap();
        assert_eq!(json["status"], "interrupted");
    }

    #[test]
    fn test_write_snapshot_uses_page_number() {
        let temp = TempDir::new().unwrap();
        let writer = RunWriter::new(temp.path(), "run.json");

        let path = writer.write_snapshot(7, "<html></html>").unwrap();

        assert!(path.ends_with("debug_page_7.html"));
        assert_eq!(fs::read_to_string(path).unwrap(), "<html></html>");
    }

    #[test]
    fn test_default_paths() {
        let writer = RunWriter::default();
        assert_eq!(
            writer.output_path(),
            Path::new("Results").join("pima_all_pages_complete.json")
        );
    }
}
