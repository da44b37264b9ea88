//! Serializes course records to the output artifact.
//!
//! The artifact is a human-readable UTF-8 text file, two lines plus a blank
//! separator per course. The writer performs no deduplication — that is the
//! scheduler's job during merge — it only guarantees that concurrent record
//! batches never interleave lines.

use std::io::Write;
use std::path::{Path, PathBuf};

use tokio::sync::Mutex;

use courseatlas_shared::{CatalogError, CourseRecord, Result};

/// Rendering for absent values: `None` credit or an empty list means
/// extraction could not determine the field (the `"N/A"` sentinel, by
/// contrast, means the source states no requirement exists).
const UNKNOWN: &str = "unknown";

/// Appends record batches to the output artifact under an exclusive lock.
pub struct DirectoryWriter {
    path: PathBuf,
    lock: Mutex<()>,
}

impl DirectoryWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a batch of records.
    ///
    /// The lock is held across the whole batch so two concurrent subject
    /// completions never interleave partial lines; the batch is flushed
    /// before the lock drops.
    pub async fn append(&self, records: &[CourseRecord]) -> Result<()> {
        let _guard = self.lock.lock().await;

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| CatalogError::io(&self.path, e))?;

        let mut batch = String::new();
        for record in records {
            batch.push_str(&format_record(record));
        }

        file.write_all(batch.as_bytes())
            .map_err(|e| CatalogError::io(&self.path, e))?;
        file.flush().map_err(|e| CatalogError::io(&self.path, e))?;

        tracing::debug!(records = records.len(), path = %self.path.display(), "batch appended");
        Ok(())
    }
}

/// Render one record in the artifact's line-oriented form.
pub fn format_record(record: &CourseRecord) -> String {
    format!(
        "{} ({}). {}\nCredit: {}. Prereq(s): {}. Gen-Ed: {}.\n\n",
        record.name,
        record.code,
        record.detail_link,
        record
            .facts
            .credit
            .map(|c| c.to_string())
            .unwrap_or_else(|| UNKNOWN.into()),
        render_list(&record.facts.prereq),
        render_list(&record.facts.gened),
    )
}

fn render_list(items: &[String]) -> String {
    if items.is_empty() {
        UNKNOWN.into()
    } else {
        items.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courseatlas_shared::{CourseFacts, CourseStub, NONE_SENTINEL};
    use std::sync::Arc;
    use url::Url;

    fn record(code: &str, name: &str, facts: CourseFacts) -> CourseRecord {
        CourseRecord::complete(
            CourseStub {
                code: code.into(),
                name: name.into(),
                detail_link: Url::parse("https://catalog.example.edu/CS/101/").unwrap(),
            },
            facts,
        )
    }

    #[test]
    fn format_complete_record() {
        let rec = record(
            "CS 101",
            "Intro Computing",
            CourseFacts {
                credit: Some(3),
                prereq: vec!["MATH 112".into(), "CS 100".into()],
                gened: vec![NONE_SENTINEL.into()],
            },
        );

        let text = format_record(&rec);
        assert_eq!(
            text,
            "Intro Computing (CS 101). https://catalog.example.edu/CS/101/\n\
             Credit: 3. Prereq(s): MATH 112, CS 100. Gen-Ed: N/A.\n\n"
        );
    }

    #[test]
    fn format_degraded_record_renders_unknown() {
        let rec = CourseRecord::degraded(
            CourseStub {
                code: "CS 225".into(),
                name: "Data Structures".into(),
                detail_link: Url::parse("https://catalog.example.edu/CS/225/").unwrap(),
            },
            "detail fetch failed: HTTP 500",
        );

        let text = format_record(&rec);
        assert!(text.contains("Credit: unknown."));
        assert!(text.contains("Prereq(s): unknown."));
        assert!(text.contains("Gen-Ed: unknown."));
    }

    #[tokio::test]
    async fn append_writes_all_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("directory.txt");
        let writer = DirectoryWriter::new(&path);

        let records = vec![
            record("CS 101", "Intro Computing", CourseFacts::default()),
            record("CS 225", "Data Structures", CourseFacts::default()),
        ];
        writer.append(&records).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("Intro Computing (CS 101)."));
        assert!(content.contains("Data Structures (CS 225)."));
        // One blank separator after each record
        assert_eq!(content.matches("\n\n").count(), 2);
    }

    #[tokio::test]
    async fn concurrent_batches_never_interleave() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("directory.txt");
        let writer = Arc::new(DirectoryWriter::new(&path));

        let mut handles = Vec::new();
        for batch_idx in 0..8 {
            let writer = Arc::clone(&writer);
            handles.push(tokio::spawn(async move {
                let records: Vec<_> = (0..5)
                    .map(|i| {
                        record(
                            &format!("B{batch_idx} {i:03}"),
                            &format!("Batch {batch_idx} Course {i}"),
                            CourseFacts::default(),
                        )
                    })
                    .collect();
                writer.append(&records).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // Each batch's five records must be contiguous in the file.
        let content = std::fs::read_to_string(&path).unwrap();
        let headers: Vec<&str> = content
            .lines()
            .filter(|l| l.starts_with("Batch "))
            .collect();
        assert_eq!(headers.len(), 40);
        for window in headers.chunks(5) {
            let batch_tag = &window[0][..7]; // "Batch N"
            assert!(
                window.iter().all(|h| h.starts_with(batch_tag)),
                "interleaved batches: {window:?}"
            );
        }
    }

    #[tokio::test]
    async fn append_to_unwritable_path_is_io_error() {
        let writer = DirectoryWriter::new("/nonexistent-dir/out.txt");
        let err = writer
            .append(&[record("CS 101", "Intro", CourseFacts::default())])
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Io { .. }));
    }
}
