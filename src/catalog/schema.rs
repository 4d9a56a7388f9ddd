pub const SCHEMA: &str = r#"
-- Catalog table: one row per observed-or-known video file
CREATE TABLE IF NOT EXISTS video_info (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    file_path TEXT NOT NULL UNIQUE,
    filename TEXT NOT NULL,
    video_code TEXT,
    fingerprint TEXT,

    -- Technical metadata (all optional, probe collaborator may fail)
    width INTEGER,
    height INTEGER,
    duration REAL,
    video_codec TEXT,
    audio_codec TEXT,
    file_size INTEGER,
    bit_rate INTEGER,
    frame_rate REAL,

    -- Four-state lifecycle: present | missing | ignore | replaced
    file_status TEXT NOT NULL DEFAULT 'present',

    tags TEXT,  -- JSON array
    logical_path TEXT,

    created_time TEXT,
    last_scan_time TEXT,
    last_merge_time TEXT
);

-- Master list: one row per video code, aggregate presence roll-up
CREATE TABLE IF NOT EXISTS video_master_list (
    video_code TEXT PRIMARY KEY,
    status TEXT NOT NULL DEFAULT 'active',
    file_count INTEGER NOT NULL DEFAULT 0,
    first_seen TEXT,
    last_updated TEXT,
    notes TEXT
);

-- Merge history: append-only, one row per executed action
CREATE TABLE IF NOT EXISTS merge_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    merge_time TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    event_type TEXT NOT NULL,
    video_code TEXT,
    old_path TEXT,
    new_path TEXT,
    details TEXT,
    scan_session_id INTEGER
);

-- Scan sessions
CREATE TABLE IF NOT EXISTS scan_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    scan_path TEXT NOT NULL,
    scan_time TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    files_found INTEGER NOT NULL DEFAULT 0,
    files_processed INTEGER NOT NULL DEFAULT 0,
    status TEXT NOT NULL DEFAULT 'running'
);

CREATE INDEX IF NOT EXISTS idx_video_file_path ON video_info(file_path);
CREATE INDEX IF NOT EXISTS idx_video_fingerprint ON video_info(fingerprint);
CREATE INDEX IF NOT EXISTS idx_video_code ON video_info(video_code);
CREATE INDEX IF NOT EXISTS idx_video_status ON video_info(file_status);
CREATE INDEX IF NOT EXISTS idx_merge_code ON merge_history(video_code);
CREATE INDEX IF NOT EXISTS idx_merge_session ON merge_history(scan_session_id);
CREATE INDEX IF NOT EXISTS idx_merge_time ON merge_history(merge_time);
CREATE INDEX IF NOT EXISTS idx_scan_path ON scan_history(scan_path);
"#;

/// Best-effort migrations for databases created by older builds.
/// Failures (column already exists) are ignored at apply time.
pub const MIGRATIONS: &[&str] = &[
    "ALTER TABLE video_info ADD COLUMN logical_path TEXT",
    "ALTER TABLE video_info ADD COLUMN last_merge_time TEXT",
    "ALTER TABLE video_master_list ADD COLUMN notes TEXT",
];
