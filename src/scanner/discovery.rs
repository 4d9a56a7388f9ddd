//! Filesystem walk that yields candidate video files.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Filters applied while walking a scan root.
#[derive(Debug, Clone)]
pub struct DiscoveryFilter {
    pub extensions: Vec<String>,
    pub min_file_size: u64,
    pub recursive: bool,
}

impl Default for DiscoveryFilter {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            min_file_size: 10 * 1024,
            recursive: true,
        }
    }
}

pub fn default_extensions() -> Vec<String> {
    [
        "mp4", "mkv", "avi", "mov", "wmv", "flv", "webm", "m4v", "mpg", "mpeg", "ts",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.') || name.starts_with("._")
}

impl DiscoveryFilter {
    fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .map(|e| {
                let ext_lower = e.to_string_lossy().to_lowercase();
                self.extensions.iter().any(|x| x.to_lowercase() == ext_lower)
            })
            .unwrap_or(false)
    }
}

/// Walk `root` and return the video files passing the filter, sorted
/// by path for consistent ordering. Hidden files and AppleDouble `._`
/// sidecars are skipped, as are unreadable directory entries.
pub fn discover(root: &Path, filter: &DiscoveryFilter) -> Vec<PathBuf> {
    let max_depth = if filter.recursive { usize::MAX } else { 1 };

    let mut videos: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(false)
        .max_depth(max_depth)
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0
                || e.file_name()
                    .to_str()
                    .map(|n| !is_hidden(n))
                    .unwrap_or(false)
        })
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| filter.matches_extension(e.path()))
        .filter(|e| {
            e.metadata()
                .map(|m| m.len() >= filter.min_file_size)
                .unwrap_or(false)
        })
        .map(|e| e.into_path())
        .collect();

    videos.sort();
    tracing::debug!(root = %root.display(), count = videos.len(), "discovery complete");
    videos
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_sized(path: &Path, size: usize) {
        fs::write(path, vec![0u8; size]).unwrap();
    }

    #[test]
    fn finds_videos_and_skips_other_extensions() {
        let dir = tempdir().unwrap();
        write_sized(&dir.path().join("ABC-123.mp4"), 20 * 1024);
        write_sized(&dir.path().join("notes.txt"), 20 * 1024);

        let found = discover(dir.path(), &DiscoveryFilter::default());
        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with("ABC-123.mp4"));
    }

    #[test]
    fn skips_files_below_minimum_size() {
        let dir = tempdir().unwrap();
        write_sized(&dir.path().join("tiny.mp4"), 1024);
        write_sized(&dir.path().join("full.mp4"), 20 * 1024);

        let found = discover(dir.path(), &DiscoveryFilter::default());
        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with("full.mp4"));
    }

    #[test]
    fn skips_hidden_files_and_sidecars() {
        let dir = tempdir().unwrap();
        write_sized(&dir.path().join(".hidden.mp4"), 20 * 1024);
        write_sized(&dir.path().join("._ABC-123.mp4"), 20 * 1024);
        write_sized(&dir.path().join("ABC-123.mp4"), 20 * 1024);

        let found = discover(dir.path(), &DiscoveryFilter::default());
        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with("ABC-123.mp4"));
    }

    #[test]
    fn hidden_directories_are_not_descended() {
        let dir = tempdir().unwrap();
        let hidden = dir.path().join(".cache");
        fs::create_dir(&hidden).unwrap();
        write_sized(&hidden.join("ABC-123.mp4"), 20 * 1024);
        write_sized(&dir.path().join("DEF-456.mp4"), 20 * 1024);

        let found = discover(dir.path(), &DiscoveryFilter::default());
        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with("DEF-456.mp4"));
    }

    #[test]
    fn non_recursive_stays_at_top_level() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("season1");
        fs::create_dir(&sub).unwrap();
        write_sized(&sub.join("ABC-123.mp4"), 20 * 1024);
        write_sized(&dir.path().join("DEF-456.mp4"), 20 * 1024);

        let filter = DiscoveryFilter {
            recursive: false,
            ..DiscoveryFilter::default()
        };
        let found = discover(dir.path(), &filter);
        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with("DEF-456.mp4"));
    }

    #[test]
    fn results_are_sorted() {
        let dir = tempdir().unwrap();
        write_sized(&dir.path().join("b.mp4"), 20 * 1024);
        write_sized(&dir.path().join("a.mp4"), 20 * 1024);
        write_sized(&dir.path().join("c.mp4"), 20 * 1024);

        let found = discover(dir.path(), &DiscoveryFilter::default());
        let names: Vec<_> = found
            .iter()
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()))
            .collect();
        assert_eq!(names, ["a.mp4", "b.mp4", "c.mp4"]);
    }
}
