//! SQLite-backed catalog store.

use anyhow::Result;
use rusqlite::Connection;
use std::path::Path;

use super::{
    now_timestamp, CatalogStats, FileStatus, MasterListEntry, MasterStatus, MergeEvent,
    MergeEventType, VideoRecord, MIGRATIONS, SCHEMA,
};

const VIDEO_COLUMNS: &str = "id, file_path, filename, video_code, fingerprint, \
     width, height, duration, video_codec, audio_codec, \
     file_size, bit_rate, frame_rate, file_status, tags, logical_path, \
     created_time, last_scan_time, last_merge_time";

pub struct Database {
    pub(crate) conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    fn initialize(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA)?;
        for migration in MIGRATIONS {
            let _ = self.conn.execute(migration, []);
        }
        Ok(())
    }

    // ========================================================================
    // Catalog entries
    // ========================================================================

    pub fn insert_video(&self, video: &VideoRecord) -> Result<i64> {
        let tags_json = tags_to_json(&video.tags);
        self.conn.execute(
            r#"
            INSERT INTO video_info (
                file_path, filename, video_code, fingerprint,
                width, height, duration, video_codec, audio_codec,
                file_size, bit_rate, frame_rate, file_status, tags, logical_path,
                created_time, last_scan_time, last_merge_time
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            rusqlite::params![
                video.file_path,
                video.filename,
                video.video_code,
                video.fingerprint,
                video.width,
                video.height,
                video.duration,
                video.video_codec,
                video.audio_codec,
                video.file_size,
                video.bit_rate,
                video.frame_rate,
                video.file_status.as_str(),
                tags_json,
                video.logical_path,
                video.created_time.clone().unwrap_or_else(now_timestamp),
                video.last_scan_time.clone().unwrap_or_else(now_timestamp),
                video.last_merge_time,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_video_by_path(&self, file_path: &str) -> Result<Option<VideoRecord>> {
        let sql = format!("SELECT {VIDEO_COLUMNS} FROM video_info WHERE file_path = ?");
        let result = self.conn.query_row(&sql, [file_path], row_to_video);
        match result {
            Ok(video) => Ok(Some(video)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn get_video_by_id(&self, id: i64) -> Result<Option<VideoRecord>> {
        let sql = format!("SELECT {VIDEO_COLUMNS} FROM video_info WHERE id = ?");
        let result = self.conn.query_row(&sql, [id], row_to_video);
        match result {
            Ok(video) => Ok(Some(video)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Insert-or-update keyed on the unique file path.
    pub fn upsert_video(&self, video: &VideoRecord) -> Result<i64> {
        if let Some(existing) = self.get_video_by_path(&video.file_path)? {
            let id = existing
                .id
                .ok_or_else(|| anyhow::anyhow!("persisted record has no id: {}", video.file_path))?;
            self.update_video(id, video)?;
            Ok(id)
        } else {
            self.insert_video(video)
        }
    }

    /// Field-level update by id: path, metadata, status, tags.
    pub fn update_video(&self, id: i64, video: &VideoRecord) -> Result<()> {
        let tags_json = tags_to_json(&video.tags);
        self.conn.execute(
            r#"
            UPDATE video_info SET
                file_path = ?, filename = ?, video_code = ?, fingerprint = ?,
                width = ?, height = ?, duration = ?, video_codec = ?, audio_codec = ?,
                file_size = ?, bit_rate = ?, frame_rate = ?, file_status = ?,
                tags = ?, logical_path = ?, last_scan_time = ?, last_merge_time = ?
            WHERE id = ?
            "#,
            rusqlite::params![
                video.file_path,
                video.filename,
                video.video_code,
                video.fingerprint,
                video.width,
                video.height,
                video.duration,
                video.video_codec,
                video.audio_codec,
                video.file_size,
                video.bit_rate,
                video.frame_rate,
                video.file_status.as_str(),
                tags_json,
                video.logical_path,
                video.last_scan_time.clone().unwrap_or_else(now_timestamp),
                video.last_merge_time,
                id,
            ],
        )?;
        Ok(())
    }

    pub fn update_video_status(&self, id: i64, status: FileStatus) -> Result<()> {
        self.conn.execute(
            "UPDATE video_info SET file_status = ?, last_merge_time = ? WHERE id = ?",
            rusqlite::params![status.as_str(), now_timestamp(), id],
        )?;
        Ok(())
    }

    pub fn all_videos(&self) -> Result<Vec<VideoRecord>> {
        let sql = format!("SELECT {VIDEO_COLUMNS} FROM video_info ORDER BY file_path");
        let mut stmt = self.conn.prepare(&sql)?;
        let videos = stmt
            .query_map([], row_to_video)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(videos)
    }

    pub fn videos_by_code(&self, video_code: &str) -> Result<Vec<VideoRecord>> {
        let sql = format!("SELECT {VIDEO_COLUMNS} FROM video_info WHERE video_code = ? ORDER BY file_path");
        let mut stmt = self.conn.prepare(&sql)?;
        let videos = stmt
            .query_map([video_code], row_to_video)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(videos)
    }

    pub fn count_videos(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM video_info", [], |row| row.get(0))?;
        Ok(count)
    }

    // ========================================================================
    // Master list
    // ========================================================================

    /// Create the master-list row for a code on first sighting, or bump
    /// its file count by one on a plain insert.
    pub fn upsert_master_entry(&self, video_code: &str) -> Result<()> {
        let now = now_timestamp();
        self.conn.execute(
            r#"
            INSERT INTO video_master_list (video_code, status, file_count, first_seen, last_updated)
            VALUES (?, 'active', 1, ?, ?)
            ON CONFLICT(video_code) DO UPDATE SET
                file_count = file_count + 1,
                last_updated = excluded.last_updated
            "#,
            rusqlite::params![video_code, now, now],
        )?;
        Ok(())
    }

    /// Make sure a master-list row exists for a code without touching
    /// its count.
    pub fn ensure_master_entry(&self, video_code: &str) -> Result<()> {
        let now = now_timestamp();
        self.conn.execute(
            r#"
            INSERT OR IGNORE INTO video_master_list (video_code, status, file_count, first_seen, last_updated)
            VALUES (?, 'active', 0, ?, ?)
            "#,
            rusqlite::params![video_code, now, now],
        )?;
        Ok(())
    }

    /// Recompute the file count for a code from the current set of
    /// `present` entries. Used after replacements, where an increment
    /// would drift.
    pub fn recompute_master_file_count(&self, video_code: &str) -> Result<i64> {
        self.ensure_master_entry(video_code)?;
        self.conn.execute(
            r#"
            UPDATE video_master_list SET
                file_count = (
                    SELECT COUNT(*) FROM video_info
                    WHERE video_code = ? AND file_status = 'present'
                ),
                last_updated = ?
            WHERE video_code = ?
            "#,
            rusqlite::params![video_code, now_timestamp(), video_code],
        )?;
        let count: i64 = self.conn.query_row(
            "SELECT file_count FROM video_master_list WHERE video_code = ?",
            [video_code],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn get_master_entry(&self, video_code: &str) -> Result<Option<MasterListEntry>> {
        let result = self.conn.query_row(
            r#"
            SELECT video_code, status, file_count, first_seen, last_updated, notes
            FROM video_master_list
            WHERE video_code = ?
            "#,
            [video_code],
            row_to_master_entry,
        );
        match result {
            Ok(entry) => Ok(Some(entry)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn set_master_status(
        &self,
        video_code: &str,
        status: MasterStatus,
        notes: Option<&str>,
    ) -> Result<()> {
        self.conn.execute(
            "UPDATE video_master_list SET status = ?, notes = ?, last_updated = ? WHERE video_code = ?",
            rusqlite::params![status.as_str(), notes, now_timestamp(), video_code],
        )?;
        Ok(())
    }

    pub fn all_master_entries(&self) -> Result<Vec<MasterListEntry>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT video_code, status, file_count, first_seen, last_updated, notes
            FROM video_master_list
            ORDER BY video_code
            "#,
        )?;
        let entries = stmt
            .query_map([], row_to_master_entry)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(entries)
    }

    // ========================================================================
    // Merge history
    // ========================================================================

    pub fn add_merge_event(
        &self,
        event_type: MergeEventType,
        video_code: Option<&str>,
        old_path: Option<&str>,
        new_path: Option<&str>,
        details: Option<&str>,
        scan_session_id: Option<i64>,
    ) -> Result<i64> {
        self.conn.execute(
            r#"
            INSERT INTO merge_history (
                merge_time, event_type, video_code, old_path, new_path, details, scan_session_id
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
            rusqlite::params![
                now_timestamp(),
                event_type.as_str(),
                video_code,
                old_path,
                new_path,
                details,
                scan_session_id,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn merge_history_by_code(&self, video_code: &str) -> Result<Vec<MergeEvent>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, merge_time, event_type, video_code, old_path, new_path, details, scan_session_id
            FROM merge_history
            WHERE video_code = ?
            ORDER BY merge_time DESC, id DESC
            "#,
        )?;
        let events = stmt
            .query_map([video_code], row_to_merge_event)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(events)
    }

    pub fn merge_history_by_session(&self, scan_session_id: i64) -> Result<Vec<MergeEvent>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, merge_time, event_type, video_code, old_path, new_path, details, scan_session_id
            FROM merge_history
            WHERE scan_session_id = ?
            ORDER BY id
            "#,
        )?;
        let events = stmt
            .query_map([scan_session_id], row_to_merge_event)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(events)
    }

    pub fn merge_history_between(&self, start: &str, end: &str) -> Result<Vec<MergeEvent>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, merge_time, event_type, video_code, old_path, new_path, details, scan_session_id
            FROM merge_history
            WHERE merge_time >= ? AND merge_time <= ?
            ORDER BY merge_time, id
            "#,
        )?;
        let events = stmt
            .query_map([start, end], row_to_merge_event)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(events)
    }

    /// Age-based prune helper; retention policy itself lives outside
    /// the engine.
    pub fn prune_merge_history(&self, max_age_days: u32) -> Result<usize> {
        let cutoff = chrono::Utc::now() - chrono::Duration::days(max_age_days as i64);
        let cutoff_str = cutoff.format("%Y-%m-%dT%H:%M:%S").to_string();
        let count = self.conn.execute(
            "DELETE FROM merge_history WHERE merge_time < ?",
            [cutoff_str],
        )?;
        Ok(count)
    }

    // ========================================================================
    // Scan sessions
    // ========================================================================

    pub fn begin_scan(&self, scan_path: &str) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO scan_history (scan_path, scan_time, status) VALUES (?, ?, 'running')",
            rusqlite::params![scan_path, now_timestamp()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn complete_scan(&self, scan_id: i64, files_found: usize, files_processed: usize) -> Result<()> {
        self.conn.execute(
            "UPDATE scan_history SET files_found = ?, files_processed = ?, status = 'completed' WHERE id = ?",
            rusqlite::params![files_found as i64, files_processed as i64, scan_id],
        )?;
        Ok(())
    }

    // ========================================================================
    // Statistics
    // ========================================================================

    pub fn statistics(&self) -> Result<CatalogStats> {
        let mut stats = CatalogStats::default();
        stats.total = self.count_videos()?;

        let mut stmt = self
            .conn
            .prepare("SELECT file_status, COUNT(*) FROM video_info GROUP BY file_status")?;
        let rows: Vec<(String, i64)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .filter_map(|r| r.ok())
            .collect();
        for (status, count) in rows {
            match FileStatus::from_str(&status) {
                Some(FileStatus::Present) => stats.present = count,
                Some(FileStatus::Missing) => stats.missing = count,
                Some(FileStatus::Ignore) => stats.ignored = count,
                Some(FileStatus::Replaced) => stats.replaced = count,
                None => {}
            }
        }

        stats.codes = self
            .conn
            .query_row("SELECT COUNT(*) FROM video_master_list", [], |row| row.get(0))?;
        stats.merge_events = self
            .conn
            .query_row("SELECT COUNT(*) FROM merge_history", [], |row| row.get(0))?;
        Ok(stats)
    }

    /// Codes with more than one `present` entry, for duplicate reporting.
    pub fn duplicate_code_groups(&self) -> Result<Vec<(String, i64)>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT video_code, COUNT(*) as cnt
            FROM video_info
            WHERE video_code IS NOT NULL AND file_status = 'present'
            GROUP BY video_code
            HAVING cnt > 1
            ORDER BY cnt DESC
            "#,
        )?;
        let groups = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(groups)
    }
}

fn tags_to_json(tags: &[String]) -> Option<String> {
    if tags.is_empty() {
        None
    } else {
        serde_json::to_string(tags).ok()
    }
}

fn tags_from_json(json: Option<String>) -> Vec<String> {
    json.and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default()
}

fn row_to_video(row: &rusqlite::Row) -> rusqlite::Result<VideoRecord> {
    let status_str: String = row.get(13)?;
    let tags_json: Option<String> = row.get(14)?;
    Ok(VideoRecord {
        id: Some(row.get(0)?),
        file_path: row.get(1)?,
        filename: row.get(2)?,
        video_code: row.get(3)?,
        fingerprint: row.get(4)?,
        width: row.get(5)?,
        height: row.get(6)?,
        duration: row.get(7)?,
        video_codec: row.get(8)?,
        audio_codec: row.get(9)?,
        file_size: row.get(10)?,
        bit_rate: row.get(11)?,
        frame_rate: row.get(12)?,
        file_status: FileStatus::from_str(&status_str).unwrap_or(FileStatus::Present),
        tags: tags_from_json(tags_json),
        logical_path: row.get(15)?,
        created_time: row.get(16)?,
        last_scan_time: row.get(17)?,
        last_merge_time: row.get(18)?,
    })
}

fn row_to_master_entry(row: &rusqlite::Row) -> rusqlite::Result<MasterListEntry> {
    let status_str: String = row.get(1)?;
    Ok(MasterListEntry {
        video_code: row.get(0)?,
        status: MasterStatus::from_str(&status_str).unwrap_or(MasterStatus::Active),
        file_count: row.get(2)?,
        first_seen: row.get(3)?,
        last_updated: row.get(4)?,
        notes: row.get(5)?,
    })
}

fn row_to_merge_event(row: &rusqlite::Row) -> rusqlite::Result<MergeEvent> {
    let type_str: String = row.get(2)?;
    Ok(MergeEvent {
        id: row.get(0)?,
        merge_time: row.get(1)?,
        event_type: MergeEventType::from_str(&type_str).unwrap_or(MergeEventType::InsertNew),
        video_code: row.get(3)?,
        old_path: row.get(4)?,
        new_path: row.get(5)?,
        details: row.get(6)?,
        scan_session_id: row.get(7)?,
    })
}
