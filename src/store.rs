//! Artifact store for written batches.
//!
//! Persists each batch as one named text file in the case-store directory.
//! Artifact names are derived deterministically from the batch's case ids,
//! so a re-run over the same cases produces the same name. Writes are
//! all-or-nothing: content lands in a `.partial` sibling first and is
//! renamed into place, so a failed write leaves no artifact visible.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::Batch;

/// Width of the `=` separator line between cases in an artifact.
const SEPARATOR_WIDTH: usize = 50;

pub struct CaseStore {
    dir: PathBuf,
}

impl CaseStore {
    /// Open the store, creating the directory if needed.
    pub fn new(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create case store directory: {}", dir.display()))?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write one batch as a single artifact and return its name.
    ///
    /// Failures are hard errors for the caller to classify; nothing is
    /// retried here and no partial artifact remains on failure.
    pub fn write_batch(&self, batch: &Batch) -> Result<String> {
        let name = artifact_name(batch);
        let body = render_batch(batch);

        let partial = self.dir.join(format!(".{}.partial", name));
        let target = self.dir.join(&name);

        if let Err(e) = fs::write(&partial, body) {
            // Nothing visible was produced; still try to clear the temp file.
            let _ = fs::remove_file(&partial);
            return Err(e)
                .with_context(|| format!("Failed to write artifact: {}", target.display()));
        }

        if let Err(e) = fs::rename(&partial, &target) {
            let _ = fs::remove_file(&partial);
            return Err(e)
                .with_context(|| format!("Failed to commit artifact: {}", target.display()));
        }

        Ok(name)
    }

    /// Number of committed artifacts in the store, for status reporting.
    pub fn artifact_count(&self) -> Result<usize> {
        let mut count = 0;
        for entry in fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read case store: {}", self.dir.display()))?
        {
            let name = entry?.file_name();
            let name = name.to_string_lossy();
            if name.starts_with("cases_") && name.ends_with(".txt") {
                count += 1;
            }
        }
        Ok(count)
    }
}

/// Deterministic artifact name: `cases_<id1>-<id2>-...-<idN>.txt`.
pub fn artifact_name(batch: &Batch) -> String {
    let ids: Vec<&str> = batch.case_ids().collect();
    format!("cases_{}.txt", ids.join("-"))
}

/// Render a batch body: per case a `Case ID:` header line, a blank line, the
/// case text, then a separator line of 50 `=` characters.
pub fn render_batch(batch: &Batch) -> String {
    let mut out = String::new();
    for (case_id, text) in batch.entries() {
        out.push_str("Case ID: ");
        out.push_str(case_id);
        out.push_str("\n\n");
        out.push_str(text);
        out.push('\n');
        out.push_str(&"=".repeat(SEPARATOR_WIDTH));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn batch_of(entries: &[(&str, &str)]) -> Batch {
        let mut batch = Batch::new(entries.len().max(1));
        for (id, text) in entries {
            batch.push(id.to_string(), text.to_string());
        }
        batch
    }

    #[test]
    fn test_artifact_name_joins_ids_in_order() {
        let batch = batch_of(&[("case-1-a", "x"), ("case-2-b", "y")]);
        assert_eq!(artifact_name(&batch), "cases_case-1-a-case-2-b.txt");
    }

    #[test]
    fn test_render_batch_format() {
        let batch = batch_of(&[("case-1-a", "First message\n\nSecond message")]);
        let expected = format!(
            "Case ID: case-1-a\n\nFirst message\n\nSecond message\n{}\n",
            "=".repeat(50)
        );
        assert_eq!(render_batch(&batch), expected);
    }

    #[test]
    fn test_render_batch_separates_cases() {
        let batch = batch_of(&[("case-1-a", "alpha"), ("case-2-b", "beta")]);
        let rendered = render_batch(&batch);
        assert_eq!(rendered.matches("Case ID: ").count(), 2);
        assert_eq!(rendered.matches(&"=".repeat(50)).count(), 2);
        // Order preserved.
        let first = rendered.find("case-1-a").unwrap();
        let second = rendered.find("case-2-b").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_write_batch_commits_file() {
        let tmp = TempDir::new().unwrap();
        let store = CaseStore::new(tmp.path()).unwrap();
        let batch = batch_of(&[("case-1-a", "hello")]);

        let name = store.write_batch(&batch).unwrap();
        assert_eq!(name, "cases_case-1-a.txt");

        let content = fs::read_to_string(tmp.path().join(&name)).unwrap();
        assert!(content.starts_with("Case ID: case-1-a\n\nhello\n"));

        // No temp file left behind.
        let leftovers: Vec<_> = fs::read_dir(tmp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".partial"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_failed_write_leaves_nothing_visible() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("store");
        let store = CaseStore::new(&dir).unwrap();

        // Pull the directory out from under the store to force the write
        // to fail.
        fs::remove_dir(&dir).unwrap();

        let batch = batch_of(&[("case-1-a", "hello")]);
        assert!(store.write_batch(&batch).is_err());
        assert!(!dir.exists());
    }

    #[test]
    fn test_artifact_count() {
        let tmp = TempDir::new().unwrap();
        let store = CaseStore::new(tmp.path()).unwrap();
        assert_eq!(store.artifact_count().unwrap(), 0);

        store.write_batch(&batch_of(&[("case-1-a", "x")])).unwrap();
        store.write_batch(&batch_of(&[("case-2-b", "y")])).unwrap();
        // Unrelated files are not counted.
        fs::write(tmp.path().join("notes.md"), "n/a").unwrap();

        assert_eq!(store.artifact_count().unwrap(), 2);
    }
}
