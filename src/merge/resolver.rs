//! Classifies freshly scanned entries against the existing catalog.

use std::collections::HashMap;

use crate::catalog::{FileStatus, VideoRecord};
use crate::merge::heuristics::{self, MergeThresholds};
use crate::merge::{MergeAction, MergePlan};
use crate::status;

/// Lookup indices over the current catalog, built once per scan
/// session and consulted for every new entry.
pub struct CatalogIndex {
    records: Vec<VideoRecord>,
    by_path: HashMap<String, usize>,
    by_fingerprint: HashMap<String, usize>,
    by_code: HashMap<String, Vec<usize>>,
}

impl CatalogIndex {
    pub fn build(records: Vec<VideoRecord>) -> Self {
        let mut by_path = HashMap::new();
        let mut by_fingerprint = HashMap::new();
        let mut by_code: HashMap<String, Vec<usize>> = HashMap::new();

        for (i, record) in records.iter().enumerate() {
            by_path.insert(record.file_path.clone(), i);
            if let Some(fp) = &record.fingerprint {
                by_fingerprint.insert(fp.clone(), i);
            }
            if let Some(code) = &record.video_code {
                by_code.entry(code.to_uppercase()).or_default().push(i);
            }
        }

        Self {
            records,
            by_path,
            by_fingerprint,
            by_code,
        }
    }

    fn by_path(&self, path: &str) -> Option<&VideoRecord> {
        self.by_path.get(path).map(|&i| &self.records[i])
    }

    fn by_fingerprint(&self, fp: &str) -> Option<&VideoRecord> {
        self.by_fingerprint.get(fp).map(|&i| &self.records[i])
    }

    fn by_code(&self, code: &str) -> impl Iterator<Item = &VideoRecord> {
        self.by_code
            .get(&code.to_uppercase())
            .into_iter()
            .flatten()
            .map(|&i| &self.records[i])
    }

    pub fn records(&self) -> &[VideoRecord] {
        &self.records
    }
}

/// Decide what to do with one freshly scanned entry. Rules are tried
/// in a fixed order and the first match wins; `None` means the entry
/// is already cataloged as-is.
pub fn resolve(
    new: &VideoRecord,
    index: &CatalogIndex,
    thresholds: &MergeThresholds,
) -> Option<MergeAction> {
    // 1. Exact path match: refresh metadata in place, or nothing.
    if let Some(existing) = index.by_path(&new.file_path) {
        if existing.metadata_differs(new) {
            return Some(MergeAction::UpdatePath {
                record: new.clone(),
                existing: existing.clone(),
                reason: "metadata_refresh".to_string(),
            });
        }
        return None;
    }

    // 2. Fingerprint match at a different path: the file moved. This
    // outranks code-based checks because an identical fingerprint is
    // the strongest move signal available.
    if let Some(fp) = &new.fingerprint {
        if let Some(existing) = index.by_fingerprint(fp) {
            if existing.file_path != new.file_path {
                return Some(MergeAction::UpdatePath {
                    record: new.clone(),
                    existing: existing.clone(),
                    reason: "file_relocation".to_string(),
                });
            }
        }
    }

    // 3. Same code, no fingerprint match. Replacement is checked
    // before plain duplication since it is the more specific call.
    if let Some(code) = &new.video_code {
        let mut duplicate_of: Option<(VideoRecord, f64)> = None;

        for existing in index.by_code(code) {
            if existing.file_status != FileStatus::Present {
                continue;
            }
            // A positive fingerprint match is the same file and was
            // handled by the relocation rule above.
            let fingerprints_match = match (&new.fingerprint, &existing.fingerprint) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            };
            if fingerprints_match {
                continue;
            }

            // Replacement requires both fingerprints present and
            // unequal; the duplicate check below does not.
            let fingerprints_differ =
                matches!((&new.fingerprint, &existing.fingerprint), (Some(a), Some(b)) if a != b);
            if fingerprints_differ && heuristics::is_replacement(new, existing, thresholds) {
                return Some(MergeAction::MarkReplaced {
                    record: new.clone(),
                    existing: existing.clone(),
                    reason: "quality_upgrade".to_string(),
                });
            }

            let score = heuristics::similarity(new, existing);
            if score > thresholds.duplicate_similarity {
                let better = duplicate_of
                    .as_ref()
                    .map_or(true, |(_, best)| score > *best);
                if better {
                    duplicate_of = Some((existing.clone(), score));
                }
            }
        }

        if let Some((existing, similarity)) = duplicate_of {
            return Some(MergeAction::DuplicateDetected {
                record: new.clone(),
                existing,
                similarity,
            });
        }
    }

    // 4. Nothing matched: a genuinely new file.
    Some(MergeAction::InsertNew {
        record: new.clone(),
    })
}

/// Build the merge plan for a batch of scanned entries, then append
/// the missing-file pass over the whole catalog. Entries already
/// targeted by an update or replacement are excluded from the missing
/// pass: their old path is expected to be absent.
pub fn build_plan(
    scanned: &[VideoRecord],
    index: &CatalogIndex,
    thresholds: &MergeThresholds,
) -> MergePlan {
    let mut plan = MergePlan::default();
    for record in scanned {
        if let Some(action) = resolve(record, index, thresholds) {
            plan.actions.push(action);
        }
    }

    let mut touched: Vec<&str> = Vec::new();
    for action in &plan.actions {
        match action {
            MergeAction::UpdatePath { existing, .. }
            | MergeAction::MarkReplaced { existing, .. } => {
                touched.push(&existing.file_path);
            }
            _ => {}
        }
    }

    let missing: Vec<MergeAction> = find_missing(index.records())
        .into_iter()
        .filter(|action| match action {
            MergeAction::MarkMissing { existing, .. } => {
                !touched.contains(&existing.file_path.as_str())
            }
            _ => true,
        })
        .collect();
    plan.actions.extend(missing);
    plan
}

/// Presence pass over the catalog: every `present`-recorded entry not
/// found on disk becomes a mark_missing action. Ignored and replaced
/// entries never participate.
pub fn find_missing(records: &[VideoRecord]) -> Vec<MergeAction> {
    let mut actions = Vec::new();
    for record in records {
        if record.file_status != FileStatus::Present {
            continue;
        }
        if status::probe(&record.file_path) == FileStatus::Missing {
            actions.push(MergeAction::MarkMissing {
                existing: record.clone(),
                reason: "presence_check".to_string(),
            });
        }
    }
    actions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint;
    use std::fs;
    use tempfile::tempdir;

    fn cataloged(path: &str, code: Option<&str>, size: i64) -> VideoRecord {
        let mut r = VideoRecord::new(path);
        r.id = Some(1);
        r.video_code = code.map(|c| c.to_string());
        r.file_size = Some(size);
        r.fingerprint = Some(fingerprint::compute(&r.filename, size as u64, 1_700_000_000, code));
        r
    }

    fn scanned(path: &str, code: Option<&str>, size: i64, mtime: i64) -> VideoRecord {
        let mut r = VideoRecord::new(path);
        r.video_code = code.map(|c| c.to_string());
        r.file_size = Some(size);
        r.fingerprint = Some(fingerprint::compute(&r.filename, size as u64, mtime, code));
        r
    }

    #[test]
    fn unchanged_path_match_is_silent() {
        let existing = cataloged("/v/ABC-123.mp4", Some("ABC-123"), 1000);
        let new = {
            let mut r = existing.clone();
            r.id = None;
            r
        };
        let index = CatalogIndex::build(vec![existing]);
        assert!(resolve(&new, &index, &MergeThresholds::default()).is_none());
    }

    #[test]
    fn changed_metadata_at_same_path_refreshes() {
        let existing = cataloged("/v/ABC-123.mp4", Some("ABC-123"), 1000);
        let mut new = existing.clone();
        new.id = None;
        new.file_size = Some(2000);
        let index = CatalogIndex::build(vec![existing]);

        match resolve(&new, &index, &MergeThresholds::default()) {
            Some(MergeAction::UpdatePath { reason, .. }) => {
                assert_eq!(reason, "metadata_refresh");
            }
            other => panic!("expected update_path, got {other:?}"),
        }
    }

    #[test]
    fn fingerprint_match_at_new_path_is_relocation() {
        let existing = cataloged("/old/ABC-123.mp4", Some("ABC-123"), 1000);
        let mut new = existing.clone();
        new.id = None;
        new.file_path = "/new/ABC-123.mp4".to_string();
        let index = CatalogIndex::build(vec![existing]);

        match resolve(&new, &index, &MergeThresholds::default()) {
            Some(MergeAction::UpdatePath { reason, .. }) => {
                assert_eq!(reason, "file_relocation");
            }
            other => panic!("expected update_path, got {other:?}"),
        }
    }

    #[test]
    fn same_code_quality_jump_is_replacement() {
        let existing = cataloged("/v/ABC-123.mp4", Some("ABC-123"), 1_000_000);
        // Same directory, but double the size: outside the ratio band.
        let new = scanned("/v/ABC-123 v2.mp4", Some("ABC-123"), 2_000_000, 1_800_000_000);
        let index = CatalogIndex::build(vec![existing]);

        match resolve(&new, &index, &MergeThresholds::default()) {
            Some(MergeAction::MarkReplaced { .. }) => {}
            other => panic!("expected mark_replaced, got {other:?}"),
        }
    }

    #[test]
    fn same_code_near_identical_is_duplicate() {
        let mut existing = cataloged("/v/ABC-123.mp4", Some("ABC-123"), 1_000_000);
        existing.duration = Some(3600.0);
        let mut new = scanned("/v/ABC-123 copy.mp4", Some("ABC-123"), 1_050_000, 1_800_000_000);
        new.duration = Some(3600.0);
        let index = CatalogIndex::build(vec![existing]);

        match resolve(&new, &index, &MergeThresholds::default()) {
            Some(MergeAction::DuplicateDetected { similarity, .. }) => {
                assert!(similarity > 0.8, "similarity {similarity}");
            }
            other => panic!("expected duplicate_detection, got {other:?}"),
        }
    }

    #[test]
    fn fingerprintless_entry_can_still_be_a_duplicate() {
        // Legacy rows may predate fingerprinting; similarity alone
        // decides the duplicate call.
        let mut existing = cataloged("/v/ABC-123.mp4", Some("ABC-123"), 1_000_000);
        existing.fingerprint = None;
        existing.duration = Some(3600.0);
        let mut new = scanned("/v/ABC-123 copy.mp4", Some("ABC-123"), 1_050_000, 1_800_000_000);
        new.duration = Some(3600.0);
        let index = CatalogIndex::build(vec![existing]);

        match resolve(&new, &index, &MergeThresholds::default()) {
            Some(MergeAction::DuplicateDetected { similarity, .. }) => {
                assert!(similarity > 0.8, "similarity {similarity}");
            }
            other => panic!("expected duplicate_detection, got {other:?}"),
        }
    }

    #[test]
    fn fingerprintless_entry_is_never_a_replacement() {
        // Without both fingerprints the supersession call cannot be
        // made, even when the quality ratios would trigger it.
        let mut existing = cataloged("/v/ABC-123.mp4", Some("ABC-123"), 1_000_000);
        existing.fingerprint = None;
        let new = scanned("/v/ABC-123 v2.mp4", Some("ABC-123"), 2_000_000, 1_800_000_000);
        let index = CatalogIndex::build(vec![existing]);

        match resolve(&new, &index, &MergeThresholds::default()) {
            Some(MergeAction::MarkReplaced { .. }) => panic!("replacement without fingerprints"),
            Some(_) | None => {}
        }
    }

    #[test]
    fn no_match_inserts() {
        let existing = cataloged("/v/ABC-123.mp4", Some("ABC-123"), 1000);
        let new = scanned("/v/XYZ-999.mp4", Some("XYZ-999"), 5000, 1_800_000_000);
        let index = CatalogIndex::build(vec![existing]);

        match resolve(&new, &index, &MergeThresholds::default()) {
            Some(MergeAction::InsertNew { .. }) => {}
            other => panic!("expected insert_new, got {other:?}"),
        }
    }

    #[test]
    fn codeless_entry_still_inserts() {
        let index = CatalogIndex::build(Vec::new());
        let new = scanned("/v/holiday video.mp4", None, 5000, 1_800_000_000);
        match resolve(&new, &index, &MergeThresholds::default()) {
            Some(MergeAction::InsertNew { .. }) => {}
            other => panic!("expected insert_new, got {other:?}"),
        }
    }

    #[test]
    fn missing_pass_skips_ignored_and_replaced() {
        let dir = tempdir().unwrap();
        let on_disk = dir.path().join("here.mp4");
        fs::write(&on_disk, b"data").unwrap();

        let mut present_gone = cataloged(
            &dir.path().join("gone.mp4").to_string_lossy(),
            Some("ABC-123"),
            1000,
        );
        present_gone.file_status = FileStatus::Present;
        let mut ignored_gone = cataloged(
            &dir.path().join("also-gone.mp4").to_string_lossy(),
            Some("DEF-456"),
            1000,
        );
        ignored_gone.file_status = FileStatus::Ignore;
        let mut present_here = cataloged(&on_disk.to_string_lossy(), Some("GHI-789"), 1000);
        present_here.file_status = FileStatus::Present;

        let actions = find_missing(&[present_gone.clone(), ignored_gone, present_here]);
        assert_eq!(actions.len(), 1);
        match &actions[0] {
            MergeAction::MarkMissing { existing, .. } => {
                assert_eq!(existing.file_path, present_gone.file_path);
            }
            other => panic!("expected mark_missing, got {other:?}"),
        }
    }
}
