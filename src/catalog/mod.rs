mod schema;
pub mod sqlite;

use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};

pub use schema::{MIGRATIONS, SCHEMA};
pub use sqlite::Database;

/// Lifecycle status of a catalog entry. Exactly one of these holds at
/// all times; the engine never deletes entries, it only transitions them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileStatus {
    Present,
    Missing,
    Ignore,
    Replaced,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Present => "present",
            FileStatus::Missing => "missing",
            FileStatus::Ignore => "ignore",
            FileStatus::Replaced => "replaced",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "present" => Some(FileStatus::Present),
            "missing" => Some(FileStatus::Missing),
            "ignore" => Some(FileStatus::Ignore),
            "replaced" => Some(FileStatus::Replaced),
            _ => None,
        }
    }
}

/// Roll-up classification of a video code in the master list,
/// independent of any individual entry's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MasterStatus {
    Active,
    Duplicate,
    Deleted,
    Archived,
}

impl MasterStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MasterStatus::Active => "active",
            MasterStatus::Duplicate => "duplicate",
            MasterStatus::Deleted => "deleted",
            MasterStatus::Archived => "archived",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(MasterStatus::Active),
            "duplicate" => Some(MasterStatus::Duplicate),
            "deleted" => Some(MasterStatus::Deleted),
            "archived" => Some(MasterStatus::Archived),
            _ => None,
        }
    }
}

/// Type of an executed merge action, one per merge-history event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeEventType {
    InsertNew,
    UpdatePath,
    MarkMissing,
    MarkReplaced,
    DuplicateDetection,
}

impl MergeEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeEventType::InsertNew => "insert_new",
            MergeEventType::UpdatePath => "update_path",
            MergeEventType::MarkMissing => "mark_missing",
            MergeEventType::MarkReplaced => "mark_replaced",
            MergeEventType::DuplicateDetection => "duplicate_detection",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "insert_new" => Some(MergeEventType::InsertNew),
            "update_path" => Some(MergeEventType::UpdatePath),
            "mark_missing" => Some(MergeEventType::MarkMissing),
            "mark_replaced" => Some(MergeEventType::MarkReplaced),
            "duplicate_detection" => Some(MergeEventType::DuplicateDetection),
            _ => None,
        }
    }
}

/// One observed-or-known video file.
///
/// `id` is `None` for freshly scanned records that have not been
/// persisted yet. All technical metadata fields are optional; the
/// heuristics degrade gracefully when they are absent.
#[derive(Debug, Clone)]
pub struct VideoRecord {
    pub id: Option<i64>,
    pub file_path: String,
    pub filename: String,
    pub video_code: Option<String>,
    pub fingerprint: Option<String>,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub duration: Option<f64>,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    pub file_size: Option<i64>,
    pub bit_rate: Option<i64>,
    pub frame_rate: Option<f64>,
    pub file_status: FileStatus,
    pub tags: Vec<String>,
    pub logical_path: Option<String>,
    pub created_time: Option<String>,
    pub last_scan_time: Option<String>,
    pub last_merge_time: Option<String>,
}

impl VideoRecord {
    /// Create a bare record for a path; metadata is filled in later
    /// by the probe collaborator.
    pub fn new(file_path: &str) -> Self {
        let filename = Path::new(file_path)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Self {
            id: None,
            file_path: file_path.to_string(),
            filename,
            video_code: None,
            fingerprint: None,
            width: None,
            height: None,
            duration: None,
            video_codec: None,
            audio_codec: None,
            file_size: None,
            bit_rate: None,
            frame_rate: None,
            file_status: FileStatus::Present,
            tags: Vec::new(),
            logical_path: None,
            created_time: None,
            last_scan_time: None,
            last_merge_time: None,
        }
    }

    /// Pixel count, when both dimensions are known.
    pub fn resolution_pixels(&self) -> Option<i64> {
        match (self.width, self.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Some(w * h),
            _ => None,
        }
    }

    /// Containing directory of the file path.
    pub fn directory(&self) -> String {
        Path::new(&self.file_path)
            .parent()
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    /// Whether any metadata field on `other` carries a new value that
    /// differs from this record. Absent fields on `other` never count
    /// as a difference.
    pub fn metadata_differs(&self, other: &VideoRecord) -> bool {
        fn differs<T: PartialEq>(existing: &Option<T>, new: &Option<T>) -> bool {
            matches!(new, Some(v) if existing.as_ref() != Some(v))
        }

        if differs(&self.file_size, &other.file_size)
            || differs(&self.duration, &other.duration)
            || differs(&self.width, &other.width)
            || differs(&self.height, &other.height)
            || differs(&self.video_codec, &other.video_codec)
            || differs(&self.audio_codec, &other.audio_codec)
            || differs(&self.bit_rate, &other.bit_rate)
            || differs(&self.frame_rate, &other.frame_rate)
        {
            return true;
        }

        // Scanned records carry no tags; an empty set on the new side
        // means "unknown", not "cleared".
        if other.tags.is_empty() {
            return false;
        }
        let mut existing_tags: Vec<&str> = self.tags.iter().map(|t| t.as_str()).collect();
        let mut new_tags: Vec<&str> = other.tags.iter().map(|t| t.as_str()).collect();
        existing_tags.sort_unstable();
        new_tags.sort_unstable();
        existing_tags != new_tags
    }

    /// Fold the fields of a freshly observed record into this one:
    /// the path moves, newer metadata wins, tags are unioned, and the
    /// entry comes back to `present`. An `ignore` entry stays ignored;
    /// only explicit user action leaves that state.
    pub fn absorb(&mut self, new: &VideoRecord) {
        self.file_path = new.file_path.clone();
        self.filename = new.filename.clone();
        // The fingerprint derives from the observed fields; a refresh
        // that changes them must carry the recomputed value along.
        if new.fingerprint.is_some() {
            self.fingerprint = new.fingerprint.clone();
        }
        if new.file_size.is_some() {
            self.file_size = new.file_size;
        }
        if new.duration.is_some() {
            self.duration = new.duration;
        }
        if new.width.is_some() {
            self.width = new.width;
        }
        if new.height.is_some() {
            self.height = new.height;
        }
        if new.video_codec.is_some() {
            self.video_codec = new.video_codec.clone();
        }
        if new.audio_codec.is_some() {
            self.audio_codec = new.audio_codec.clone();
        }
        if new.bit_rate.is_some() {
            self.bit_rate = new.bit_rate;
        }
        if new.frame_rate.is_some() {
            self.frame_rate = new.frame_rate;
        }
        if new.logical_path.is_some() {
            self.logical_path = new.logical_path.clone();
        }
        for tag in &new.tags {
            if !self.tags.contains(tag) {
                self.tags.push(tag.clone());
            }
        }
        if self.file_status != FileStatus::Ignore {
            self.file_status = FileStatus::Present;
        }
        self.last_scan_time = Some(now_timestamp());
    }
}

/// One row per video code: the aggregate presence roll-up.
#[derive(Debug, Clone)]
pub struct MasterListEntry {
    pub video_code: String,
    pub status: MasterStatus,
    pub file_count: i64,
    pub first_seen: Option<String>,
    pub last_updated: Option<String>,
    pub notes: Option<String>,
}

/// One immutable merge-history record.
#[derive(Debug, Clone)]
pub struct MergeEvent {
    pub id: i64,
    pub merge_time: String,
    pub event_type: MergeEventType,
    pub video_code: Option<String>,
    pub old_path: Option<String>,
    pub new_path: Option<String>,
    pub details: Option<String>,
    pub scan_session_id: Option<i64>,
}

/// Aggregate catalog counts exposed to callers.
#[derive(Debug, Clone, Default)]
pub struct CatalogStats {
    pub total: i64,
    pub present: i64,
    pub missing: i64,
    pub ignored: i64,
    pub replaced: i64,
    pub codes: i64,
    pub merge_events: i64,
}

/// Timestamp format used everywhere in the store.
pub fn now_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips() {
        for status in [
            FileStatus::Present,
            FileStatus::Missing,
            FileStatus::Ignore,
            FileStatus::Replaced,
        ] {
            assert_eq!(FileStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(FileStatus::from_str("deleted"), None);
    }

    #[test]
    fn metadata_differs_ignores_absent_fields() {
        let mut existing = VideoRecord::new("/videos/ABC-123.mp4");
        existing.file_size = Some(1000);
        existing.width = Some(1920);

        // A probe failure leaves everything None; that is not a difference.
        let sparse = VideoRecord::new("/videos/ABC-123.mp4");
        assert!(!existing.metadata_differs(&sparse));

        let mut changed = VideoRecord::new("/videos/ABC-123.mp4");
        changed.file_size = Some(2000);
        assert!(existing.metadata_differs(&changed));
    }

    #[test]
    fn metadata_differs_on_tag_set() {
        let mut existing = VideoRecord::new("/videos/ABC-123.mp4");
        existing.tags = vec!["a".to_string(), "b".to_string()];

        let mut new = VideoRecord::new("/videos/ABC-123.mp4");
        new.tags = vec!["b".to_string(), "a".to_string()];
        assert!(!existing.metadata_differs(&new));

        new.tags.push("c".to_string());
        assert!(existing.metadata_differs(&new));
    }

    #[test]
    fn absorb_moves_path_and_unions_tags() {
        let mut existing = VideoRecord::new("/old/ABC-123.mp4");
        existing.file_size = Some(1000);
        existing.file_status = FileStatus::Missing;
        existing.tags = vec!["old".to_string()];

        let mut new = VideoRecord::new("/new/ABC-123.mp4");
        new.tags = vec!["new".to_string()];

        existing.absorb(&new);
        assert_eq!(existing.file_path, "/new/ABC-123.mp4");
        assert_eq!(existing.file_size, Some(1000));
        assert_eq!(existing.file_status, FileStatus::Present);
        assert_eq!(existing.tags, vec!["old".to_string(), "new".to_string()]);
    }

    #[test]
    fn absorb_keeps_ignored_entries_ignored() {
        let mut existing = VideoRecord::new("/v/ABC-123.mp4");
        existing.file_status = FileStatus::Ignore;

        let mut new = VideoRecord::new("/v/ABC-123.mp4");
        new.file_size = Some(2000);

        existing.absorb(&new);
        assert_eq!(existing.file_size, Some(2000));
        assert_eq!(existing.file_status, FileStatus::Ignore);
    }

    #[test]
    fn absorb_carries_the_recomputed_fingerprint() {
        let mut existing = VideoRecord::new("/v/ABC-123.mp4");
        existing.fingerprint = Some("old-fp".to_string());

        let mut new = VideoRecord::new("/v/ABC-123.mp4");
        new.fingerprint = Some("new-fp".to_string());
        existing.absorb(&new);
        assert_eq!(existing.fingerprint.as_deref(), Some("new-fp"));

        // A record without a fingerprint leaves the stored one alone.
        let sparse = VideoRecord::new("/v/ABC-123.mp4");
        existing.absorb(&sparse);
        assert_eq!(existing.fingerprint.as_deref(), Some("new-fp"));
    }
}
