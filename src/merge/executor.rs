//! Applies a merge plan to the catalog store.

use crate::catalog::{Database, FileStatus, MergeEventType, VideoRecord};
use crate::merge::{MergeAction, MergePlan, ScanSession};

/// Aggregate outcome of one executed merge plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub inserted: usize,
    pub updated: usize,
    pub marked_missing: usize,
    pub marked_replaced: usize,
    pub duplicates_detected: usize,
    pub errors: usize,
}

impl MergeStats {
    pub fn total_actions(&self) -> usize {
        self.inserted
            + self.updated
            + self.marked_missing
            + self.marked_replaced
            + self.duplicates_detected
    }
}

/// Apply every action in the plan, in the fixed order
/// insert -> update -> mark_missing -> mark_replaced -> duplicate
/// logging. Each action is attempted independently; a failure is
/// logged and counted without aborting the rest of the batch.
pub fn execute(plan: &MergePlan, db: &Database, session: &ScanSession) -> MergeStats {
    let mut stats = MergeStats::default();

    let mut inserts = Vec::new();
    let mut updates = Vec::new();
    let mut missing = Vec::new();
    let mut replaced = Vec::new();
    let mut duplicates = Vec::new();
    for action in &plan.actions {
        match action {
            MergeAction::InsertNew { .. } => inserts.push(action),
            MergeAction::UpdatePath { .. } => updates.push(action),
            MergeAction::MarkMissing { .. } => missing.push(action),
            MergeAction::MarkReplaced { .. } => replaced.push(action),
            MergeAction::DuplicateDetected { .. } => duplicates.push(action),
        }
    }

    for action in inserts
        .into_iter()
        .chain(updates)
        .chain(missing)
        .chain(replaced)
        .chain(duplicates)
    {
        match apply(action, db, session) {
            Ok(()) => match action {
                MergeAction::InsertNew { .. } => stats.inserted += 1,
                MergeAction::UpdatePath { .. } => stats.updated += 1,
                MergeAction::MarkMissing { .. } => stats.marked_missing += 1,
                MergeAction::MarkReplaced { .. } => stats.marked_replaced += 1,
                MergeAction::DuplicateDetected { .. } => stats.duplicates_detected += 1,
            },
            Err(e) => {
                stats.errors += 1;
                tracing::warn!(kind = action.kind(), error = %e, "merge action failed");
            }
        }
    }

    tracing::info!(
        session = session.id,
        inserted = stats.inserted,
        updated = stats.updated,
        marked_missing = stats.marked_missing,
        marked_replaced = stats.marked_replaced,
        duplicates = stats.duplicates_detected,
        errors = stats.errors,
        "merge plan executed"
    );
    stats
}

fn apply(action: &MergeAction, db: &Database, session: &ScanSession) -> anyhow::Result<()> {
    match action {
        MergeAction::InsertNew { record } => insert_new(record, db, session),
        MergeAction::UpdatePath {
            record,
            existing,
            reason,
        } => update_path(record, existing, reason, db, session),
        MergeAction::MarkMissing { existing, reason } => {
            mark_missing(existing, reason, db, session)
        }
        MergeAction::MarkReplaced {
            record,
            existing,
            reason,
        } => mark_replaced(record, existing, reason, db, session),
        MergeAction::DuplicateDetected {
            record,
            existing,
            similarity,
        } => log_duplicate(record, existing, *similarity, db, session),
    }
}

fn insert_new(record: &VideoRecord, db: &Database, session: &ScanSession) -> anyhow::Result<()> {
    db.insert_video(record)?;
    if let Some(code) = &record.video_code {
        db.upsert_master_entry(code)?;
    }
    db.add_merge_event(
        MergeEventType::InsertNew,
        record.video_code.as_deref(),
        None,
        Some(&record.file_path),
        None,
        Some(session.id),
    )?;
    Ok(())
}

fn update_path(
    record: &VideoRecord,
    existing: &VideoRecord,
    reason: &str,
    db: &Database,
    session: &ScanSession,
) -> anyhow::Result<()> {
    let id = existing
        .id
        .ok_or_else(|| anyhow::anyhow!("existing entry has no row id: {}", existing.file_path))?;

    let mut merged = existing.clone();
    merged.absorb(record);
    db.update_video(id, &merged)?;

    db.add_merge_event(
        MergeEventType::UpdatePath,
        merged.video_code.as_deref(),
        Some(&existing.file_path),
        Some(&record.file_path),
        Some(reason),
        Some(session.id),
    )?;
    Ok(())
}

fn mark_missing(
    existing: &VideoRecord,
    reason: &str,
    db: &Database,
    session: &ScanSession,
) -> anyhow::Result<()> {
    let id = existing
        .id
        .ok_or_else(|| anyhow::anyhow!("existing entry has no row id: {}", existing.file_path))?;
    db.update_video_status(id, FileStatus::Missing)?;
    db.add_merge_event(
        MergeEventType::MarkMissing,
        existing.video_code.as_deref(),
        Some(&existing.file_path),
        None,
        Some(reason),
        Some(session.id),
    )?;
    Ok(())
}

fn mark_replaced(
    record: &VideoRecord,
    existing: &VideoRecord,
    reason: &str,
    db: &Database,
    session: &ScanSession,
) -> anyhow::Result<()> {
    let id = existing
        .id
        .ok_or_else(|| anyhow::anyhow!("existing entry has no row id: {}", existing.file_path))?;

    db.update_video_status(id, FileStatus::Replaced)?;
    db.insert_video(record)?;
    if let Some(code) = &record.video_code {
        db.ensure_master_entry(code)?;
        db.recompute_master_file_count(code)?;
    }

    db.add_merge_event(
        MergeEventType::MarkReplaced,
        record.video_code.as_deref(),
        Some(&existing.file_path),
        Some(&record.file_path),
        Some(reason),
        Some(session.id),
    )?;
    Ok(())
}

fn log_duplicate(
    record: &VideoRecord,
    existing: &VideoRecord,
    similarity: f64,
    db: &Database,
    session: &ScanSession,
) -> anyhow::Result<()> {
    let details = format!("similarity={similarity:.3}");
    db.add_merge_event(
        MergeEventType::DuplicateDetection,
        record.video_code.as_deref(),
        Some(&existing.file_path),
        Some(&record.file_path),
        Some(&details),
        Some(session.id),
    )?;
    tracing::info!(
        code = record.video_code.as_deref().unwrap_or("-"),
        new = %record.file_path,
        existing = %existing.file_path,
        similarity,
        "duplicate detected, left for manual disposition"
    );
    Ok(())
}
