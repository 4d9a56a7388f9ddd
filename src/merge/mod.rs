//! Reconciliation of scanned files against the catalog.
//!
//! A scan produces candidate [`VideoRecord`]s; the resolver matches
//! each against the existing catalog and emits a [`MergeAction`]. The
//! executor applies the resulting [`MergePlan`] in a fixed order and
//! records one merge-history event per action.

pub mod heuristics;

mod executor;
mod resolver;

pub use executor::{execute, MergeStats};
pub use resolver::{build_plan, find_missing, resolve, CatalogIndex};

use crate::catalog::{now_timestamp, VideoRecord};

/// What to do with one scanned file (or one absent catalog entry).
#[derive(Debug, Clone)]
pub enum MergeAction {
    /// No existing entry matches; add the record to the catalog.
    InsertNew { record: VideoRecord },
    /// An existing entry is the same video; refresh it in place.
    UpdatePath {
        record: VideoRecord,
        existing: VideoRecord,
        reason: String,
    },
    /// A catalog entry recorded as present no longer exists on disk.
    MarkMissing {
        existing: VideoRecord,
        reason: String,
    },
    /// The scanned file supersedes an existing entry for the same code.
    MarkReplaced {
        record: VideoRecord,
        existing: VideoRecord,
        reason: String,
    },
    /// Same code, high similarity, but not a replacement. Logged only.
    DuplicateDetected {
        record: VideoRecord,
        existing: VideoRecord,
        similarity: f64,
    },
}

impl MergeAction {
    pub fn kind(&self) -> &'static str {
        match self {
            MergeAction::InsertNew { .. } => "insert_new",
            MergeAction::UpdatePath { .. } => "update_path",
            MergeAction::MarkMissing { .. } => "mark_missing",
            MergeAction::MarkReplaced { .. } => "mark_replaced",
            MergeAction::DuplicateDetected { .. } => "duplicate_detection",
        }
    }
}

/// The full set of actions produced by one reconciliation pass.
#[derive(Debug, Clone, Default)]
pub struct MergePlan {
    pub actions: Vec<MergeAction>,
}

/// Identifies one scan run so merge-history events can be traced back
/// to the scan that produced them.
#[derive(Debug, Clone)]
pub struct ScanSession {
    pub id: i64,
    pub scan_path: String,
    pub started: String,
}

impl ScanSession {
    pub fn new(id: i64, scan_path: &str) -> Self {
        Self {
            id,
            scan_path: scan_path.to_string(),
            started: now_timestamp(),
        }
    }
}
