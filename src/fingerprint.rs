//! Lightweight file fingerprinting.
//!
//! A fingerprint is derived from cheap, stable attributes: the
//! lower-cased filename root, the file size, the modification time
//! truncated to whole seconds, and the video code when one is known.
//! It survives a pure relocation (same basename, size, mtime) and
//! changes on any rename or content modification.

use std::collections::HashMap;

use md5::{Digest, Md5};

use crate::catalog::VideoRecord;

const FIELD_SEPARATOR: &str = "|";

/// Compute the fingerprint for a file's stable attributes.
/// Deterministic: equal inputs always yield equal output.
pub fn compute(
    filename: &str,
    file_size: u64,
    mtime_secs: i64,
    video_code: Option<&str>,
) -> String {
    let root = filename_root(filename).to_lowercase();
    let mut parts = vec![root, file_size.to_string(), mtime_secs.to_string()];
    if let Some(code) = video_code {
        parts.push(code.to_lowercase());
    }

    let mut hasher = Md5::new();
    hasher.update(parts.join(FIELD_SEPARATOR).as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Filename without its final extension.
fn filename_root(filename: &str) -> &str {
    match filename.rsplit_once('.') {
        Some((root, _)) if !root.is_empty() => root,
        _ => filename,
    }
}

/// Two or more distinct paths that hashed to the same fingerprint.
/// Collisions are surfaced as diagnostics, never silently merged.
#[derive(Debug, Clone)]
pub struct FingerprintCollision {
    pub fingerprint: String,
    pub paths: Vec<String>,
}

/// Result of fingerprinting a batch of records.
#[derive(Debug, Default)]
pub struct BatchFingerprints {
    /// file_path -> fingerprint
    pub by_path: HashMap<String, String>,
    pub collisions: Vec<FingerprintCollision>,
}

/// Scan a set of records for fingerprints shared by different paths.
/// Records without a fingerprint are skipped.
pub fn detect_collisions(records: &[VideoRecord]) -> Vec<FingerprintCollision> {
    let mut groups: HashMap<&str, Vec<&str>> = HashMap::new();
    for record in records {
        if let Some(fp) = record.fingerprint.as_deref() {
            groups.entry(fp).or_default().push(&record.file_path);
        }
    }

    let mut collisions: Vec<FingerprintCollision> = groups
        .into_iter()
        .filter(|(_, paths)| paths.len() > 1)
        .map(|(fp, paths)| FingerprintCollision {
            fingerprint: fp.to_string(),
            paths: paths.into_iter().map(|p| p.to_string()).collect(),
        })
        .collect();
    collisions.sort_by(|a, b| a.fingerprint.cmp(&b.fingerprint));
    collisions
}

/// Fingerprint every record in place, reporting collisions between
/// distinct paths as a diagnostic.
pub fn fingerprint_batch(records: &mut [VideoRecord], mtimes: &HashMap<String, i64>) -> BatchFingerprints {
    let mut result = BatchFingerprints::default();
    for record in records.iter_mut() {
        let (Some(size), Some(mtime)) = (record.file_size, mtimes.get(&record.file_path)) else {
            continue;
        };
        let fp = compute(
            &record.filename,
            size as u64,
            *mtime,
            record.video_code.as_deref(),
        );
        result.by_path.insert(record.file_path.clone(), fp.clone());
        record.fingerprint = Some(fp);
    }
    result.collisions = detect_collisions(records);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        let a = compute("ABC-123.mp4", 1_000_000, 1_700_000_000, Some("ABC-123"));
        let b = compute("ABC-123.mp4", 1_000_000, 1_700_000_000, Some("ABC-123"));
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn each_input_field_matters() {
        let base = compute("ABC-123.mp4", 1_000_000, 1_700_000_000, Some("ABC-123"));
        assert_ne!(base, compute("ABC-124.mp4", 1_000_000, 1_700_000_000, Some("ABC-123")));
        assert_ne!(base, compute("ABC-123.mp4", 1_000_001, 1_700_000_000, Some("ABC-123")));
        assert_ne!(base, compute("ABC-123.mp4", 1_000_000, 1_700_000_001, Some("ABC-123")));
        assert_ne!(base, compute("ABC-123.mp4", 1_000_000, 1_700_000_000, None));
    }

    #[test]
    fn extension_and_case_do_not_matter() {
        // A container remux keeps the root; the fingerprint keys on the
        // root so an .mp4 -> .mkv rename with same size/mtime matches.
        let a = compute("ABC-123.mp4", 10, 20, None);
        let b = compute("ABC-123.mkv", 10, 20, None);
        assert_eq!(a, b);

        let c = compute("abc-123.mp4", 10, 20, None);
        assert_eq!(a, c);
    }

    #[test]
    fn collision_detection_groups_paths() {
        let mut r1 = VideoRecord::new("/a/x.mp4");
        r1.fingerprint = Some("deadbeef".to_string());
        let mut r2 = VideoRecord::new("/b/y.mp4");
        r2.fingerprint = Some("deadbeef".to_string());
        let mut r3 = VideoRecord::new("/c/z.mp4");
        r3.fingerprint = Some("cafebabe".to_string());

        let collisions = detect_collisions(&[r1, r2, r3]);
        assert_eq!(collisions.len(), 1);
        assert_eq!(collisions[0].fingerprint, "deadbeef");
        assert_eq!(collisions[0].paths.len(), 2);
    }

    #[test]
    fn batch_skips_records_without_size_or_mtime() {
        let mut records = vec![VideoRecord::new("/a/x.mp4")];
        let mtimes = HashMap::new();
        let batch = fingerprint_batch(&mut records, &mtimes);
        assert!(batch.by_path.is_empty());
        assert!(records[0].fingerprint.is_none());
    }
}
