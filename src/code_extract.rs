//! Video-code extraction from filenames.
//!
//! A video code is the short business identifier (`ABC-123`) that
//! groups catalog entries representing the same logical title. Rules
//! are tried most specific first; a filename with no matching rule
//! simply has no code, which is a legitimate outcome.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

/// Pattern rules in priority order.
static CODE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // Standard dashed form: ABC-123
        r"(?i)([A-Z]{2,6}-\d{2,6})",
        // Underscore form: ABC_123
        r"(?i)([A-Z]{2,6}_\d{2,6})",
        // Bare digit run, at least 4 digits: 123456
        r"(\d{4,8})",
        // Joined alphanumeric: ABC123
        r"(?i)([A-Z]{2,4}\d{2,6})",
        // Dotted form: ABC.123
        r"(?i)([A-Z]{2,6}\.\d{2,6})",
        // Dashed form with a short suffix: ABC-123-HD
        r"(?i)([A-Z]{2,6}-\d{2,6}(?:-[A-Z0-9]{1,4})?)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("invalid code pattern"))
    .collect()
});

static BRACKETED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[.*?\]").expect("invalid bracket pattern"));

static PARENTHESIZED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(.*?\)").expect("invalid paren pattern"));

static QUALITY_MARKERS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\b(1080p|720p|480p|4K|HD|SD|BluRay|DVDRip|WEBRip|HDTV)\b",
        r"(?i)\b(x264|x265|H264|H265|HEVC|AVC)\b",
        r"(?i)\b(AAC|AC3|DTS|MP3|FLAC)\b",
        r"(?i)\b(PROPER|REPACK|INTERNAL|LIMITED)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("invalid quality marker pattern"))
    .collect()
});

static MULTI_SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("invalid spaces pattern"));

/// Strings that look like codes but are release-name noise.
const STOP_WORDS: &[&str] = &[
    "DVD", "BLU", "RAY", "WEB", "RIP", "CAM", "TS", "TC", "SCR", "R5", "R6", "HDTV", "PDTV",
    "DSR", "HDCAM", "1080", "720", "480", "2160", "UHD", "4K", "HD", "SD", "X264", "X265",
    "H264", "H265", "HEVC", "AVC", "XVID", "AAC", "AC3", "DTS", "MP3", "FLAC", "OGG", "WAV",
    "ENG", "CHN", "JPN", "KOR", "FRA", "GER", "SPA", "ITA",
];

/// Extract the video code from a filename (path components and
/// extension are stripped first). Returns `None` when no rule matches,
/// leaving the entry to fingerprint- and path-based matching only.
pub fn extract_code(filename: &str) -> Option<String> {
    if filename.is_empty() {
        return None;
    }

    let base = Path::new(filename)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let cleaned = clean_filename(&base);

    for pattern in CODE_PATTERNS.iter() {
        if let Some(captures) = pattern.captures(&cleaned) {
            if let Some(m) = captures.get(1) {
                let code = m.as_str().to_uppercase();
                if validate_code(&code) {
                    return Some(code);
                }
            }
        }
    }
    None
}

/// Strip bracketed chunks and release quality markers that interfere
/// with the pattern rules.
fn clean_filename(name: &str) -> String {
    let mut cleaned = BRACKETED.replace_all(name, " ").into_owned();
    cleaned = PARENTHESIZED.replace_all(&cleaned, " ").into_owned();
    for marker in QUALITY_MARKERS.iter() {
        cleaned = marker.replace_all(&cleaned, " ").into_owned();
    }
    MULTI_SPACES.replace_all(&cleaned, " ").trim().to_string()
}

fn validate_code(code: &str) -> bool {
    if code.len() < 3 || code.len() > 20 {
        return false;
    }
    if STOP_WORDS.contains(&code) {
        return false;
    }
    // Short pure-digit runs are almost always years or resolutions.
    if code.chars().all(|c| c.is_ascii_digit()) && code.len() < 4 {
        return false;
    }
    true
}
