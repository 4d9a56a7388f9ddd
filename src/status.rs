//! File status lifecycle and presence checks.
//!
//! The four states are `present`, `missing`, `ignore`, and `replaced`.
//! Presence checks only ever move entries between `present` and
//! `missing`; `ignore` is entered and left exclusively by user action,
//! and `replaced` only through a mark_replaced merge action.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::catalog::{now_timestamp, FileStatus, VideoRecord};

/// Probe whether the file at `path` is actually addressable.
/// A file that exists but cannot be opened counts as missing.
pub fn probe(path: &str) -> FileStatus {
    let p = Path::new(path);
    if !p.is_file() {
        return FileStatus::Missing;
    }
    match File::open(p) {
        Ok(mut f) => {
            let mut byte = [0u8; 1];
            match f.read(&mut byte) {
                Ok(_) => FileStatus::Present,
                Err(_) => FileStatus::Missing,
            }
        }
        Err(_) => FileStatus::Missing,
    }
}

/// One recorded status transition, kept for audit.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub file_path: String,
    pub old_status: FileStatus,
    pub new_status: FileStatus,
    pub reason: String,
    pub timestamp: String,
}

/// Summary of a batch presence check.
#[derive(Debug, Clone, Default)]
pub struct StatusCheckReport {
    pub checked: usize,
    pub present: usize,
    pub missing: usize,
    pub ignored: usize,
    pub replaced: usize,
    /// Entries whose recorded status disagreed with the probe
    /// (and were aligned by the auto-fix pass).
    pub changes: Vec<StatusChange>,
}

/// Tracks status transitions and applies presence checks.
#[derive(Debug, Default)]
pub struct StatusTracker {
    history: Vec<StatusChange>,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transition a record to a new status, recording the change.
    pub fn set_status(&mut self, record: &mut VideoRecord, new_status: FileStatus, reason: &str) {
        let old_status = record.file_status;
        if old_status == new_status {
            return;
        }
        record.file_status = new_status;
        self.history.push(StatusChange {
            file_path: record.file_path.clone(),
            old_status,
            new_status,
            reason: reason.to_string(),
            timestamp: now_timestamp(),
        });
        tracing::debug!(
            path = %record.file_path,
            from = old_status.as_str(),
            to = new_status.as_str(),
            reason,
            "status transition"
        );
    }

    /// Probe every entry and align recorded status with reality.
    ///
    /// `ignore` entries are skipped entirely; `replaced` is terminal
    /// and never re-enters presence checks. Only present <-> missing
    /// transitions happen here.
    pub fn batch_check(&mut self, records: &mut [VideoRecord]) -> StatusCheckReport {
        let mut report = StatusCheckReport::default();

        for record in records.iter_mut() {
            report.checked += 1;

            match record.file_status {
                FileStatus::Ignore => {
                    report.ignored += 1;
                    continue;
                }
                FileStatus::Replaced => {
                    report.replaced += 1;
                    continue;
                }
                FileStatus::Present | FileStatus::Missing => {}
            }

            let actual = probe(&record.file_path);
            if actual != record.file_status {
                let old = record.file_status;
                self.set_status(record, actual, "presence_check");
                report.changes.push(StatusChange {
                    file_path: record.file_path.clone(),
                    old_status: old,
                    new_status: actual,
                    reason: "presence_check".to_string(),
                    timestamp: now_timestamp(),
                });
            }

            match actual {
                FileStatus::Present => report.present += 1,
                FileStatus::Missing => report.missing += 1,
                _ => {}
            }
        }

        report
    }

    /// Explicit user action: exclude entries from presence checks and
    /// master-list counts.
    pub fn mark_ignored(&mut self, records: &mut [VideoRecord], reason: &str) -> usize {
        let mut count = 0;
        for record in records.iter_mut() {
            if record.file_status != FileStatus::Ignore {
                self.set_status(record, FileStatus::Ignore, reason);
                count += 1;
            }
        }
        count
    }

    /// Explicit user action: restore ignored entries to their probed
    /// on-disk status.
    pub fn unmark_ignored(&mut self, records: &mut [VideoRecord]) -> usize {
        let mut count = 0;
        for record in records.iter_mut() {
            if record.file_status == FileStatus::Ignore {
                let actual = probe(&record.file_path);
                self.set_status(record, actual, "unmark_ignored");
                count += 1;
            }
        }
        count
    }

    /// Most recent transitions, optionally filtered to one path.
    pub fn history(&self, file_path: Option<&str>, limit: usize) -> Vec<&StatusChange> {
        self.history
            .iter()
            .rev()
            .filter(|c| file_path.map_or(true, |p| c.file_path == p))
            .take(limit)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn record_at(path: &Path, status: FileStatus) -> VideoRecord {
        let mut r = VideoRecord::new(&path.to_string_lossy());
        r.file_status = status;
        r
    }

    #[test]
    fn probe_distinguishes_present_and_missing() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("ABC-123.mp4");
        fs::write(&file, b"data").unwrap();

        assert_eq!(probe(&file.to_string_lossy()), FileStatus::Present);
        assert_eq!(
            probe(&dir.path().join("gone.mp4").to_string_lossy()),
            FileStatus::Missing
        );
    }

    #[test]
    fn batch_check_aligns_recorded_status() {
        let dir = tempdir().unwrap();
        let existing = dir.path().join("here.mp4");
        fs::write(&existing, b"data").unwrap();

        let mut records = vec![
            record_at(&existing, FileStatus::Missing), // reappeared
            record_at(&dir.path().join("gone.mp4"), FileStatus::Present), // vanished
        ];

        let mut tracker = StatusTracker::new();
        let report = tracker.batch_check(&mut records);

        assert_eq!(report.checked, 2);
        assert_eq!(report.present, 1);
        assert_eq!(report.missing, 1);
        assert_eq!(report.changes.len(), 2);
        assert_eq!(records[0].file_status, FileStatus::Present);
        assert_eq!(records[1].file_status, FileStatus::Missing);
    }

    #[test]
    fn ignore_is_never_touched_by_presence_checks() {
        let dir = tempdir().unwrap();
        let mut records = vec![record_at(&dir.path().join("gone.mp4"), FileStatus::Ignore)];

        let mut tracker = StatusTracker::new();
        let report = tracker.batch_check(&mut records);

        assert_eq!(report.ignored, 1);
        assert!(report.changes.is_empty());
        assert_eq!(records[0].file_status, FileStatus::Ignore);
    }

    #[test]
    fn replaced_is_terminal_for_presence_checks() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("old.mp4");
        fs::write(&file, b"data").unwrap();
        // The file still exists on disk, but the entry stays replaced.
        let mut records = vec![record_at(&file, FileStatus::Replaced)];

        let mut tracker = StatusTracker::new();
        let report = tracker.batch_check(&mut records);

        assert_eq!(report.replaced, 1);
        assert_eq!(records[0].file_status, FileStatus::Replaced);
    }

    #[test]
    fn ignore_round_trip_requires_explicit_action() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("here.mp4");
        fs::write(&file, b"data").unwrap();
        let mut records = vec![record_at(&file, FileStatus::Present)];

        let mut tracker = StatusTracker::new();
        assert_eq!(tracker.mark_ignored(&mut records, "user_request"), 1);
        assert_eq!(records[0].file_status, FileStatus::Ignore);

        // Already ignored: no double count.
        assert_eq!(tracker.mark_ignored(&mut records, "user_request"), 0);

        assert_eq!(tracker.unmark_ignored(&mut records), 1);
        assert_eq!(records[0].file_status, FileStatus::Present);
    }

    #[test]
    fn history_is_filtered_and_bounded() {
        let dir = tempdir().unwrap();
        let mut a = record_at(&dir.path().join("a.mp4"), FileStatus::Present);
        let mut b = record_at(&dir.path().join("b.mp4"), FileStatus::Present);

        let mut tracker = StatusTracker::new();
        tracker.set_status(&mut a, FileStatus::Missing, "test");
        tracker.set_status(&mut b, FileStatus::Missing, "test");
        tracker.set_status(&mut a, FileStatus::Present, "test");

        assert_eq!(tracker.history(None, 10).len(), 3);
        let a_path = a.file_path.clone();
        assert_eq!(tracker.history(Some(&a_path), 10).len(), 2);
        assert_eq!(tracker.history(None, 1).len(), 1);
    }
}
