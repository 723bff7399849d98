use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const WIQ_DIR: &str = ".wiq";
pub const CONFIG_FILE: &str = ".wiq/config.yaml";
pub const DEFAULT_CACHE_FILE: &str = ".wiq/cache.json";
pub const DEFAULT_REPORTS_DIR: &str = "reports";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn wiq_dir(root: &Path) -> PathBuf {
    root.join(WIQ_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

/// Resolve a configured path against the project root. Absolute paths are
/// returned unchanged.
pub fn resolve(root: &Path, configured: &Path) -> PathBuf {
    if configured.is_absolute() {
        configured.to_path_buf()
    } else {
        root.join(configured)
    }
}

/// Query label made safe for a file name: anything outside `[A-Za-z0-9._-]`
/// becomes `_`.
pub fn file_label(label: &str) -> String {
    label
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// `{label}_quality_report_{stamp}.csv`
pub fn report_csv_name(label: &str, stamp: &str) -> String {
    format!("{}_quality_report_{stamp}.csv", file_label(label))
}

/// `{label}_summary_{stamp}.txt`
pub fn summary_name(label: &str, stamp: &str) -> String {
    format!("{}_summary_{stamp}.txt", file_label(label))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_helpers() {
        let root = Path::new("/tmp/proj");
        assert_eq!(config_path(root), PathBuf::from("/tmp/proj/.wiq/config.yaml"));
        assert_eq!(
            resolve(root, Path::new(".wiq/cache.json")),
            PathBuf::from("/tmp/proj/.wiq/cache.json")
        );
        assert_eq!(
            resolve(root, Path::new("/var/cache.json")),
            PathBuf::from("/var/cache.json")
        );
    }

    #[test]
    fn report_names() {
        assert_eq!(
            report_csv_name("Q12026_Features", "20260301_120000"),
            "Q12026_Features_quality_report_20260301_120000.csv"
        );
        assert_eq!(
            summary_name("Q12026_Features", "20260301_120000"),
            "Q12026_Features_summary_20260301_120000.txt"
        );
    }

    #[test]
    fn labels_are_file_safe() {
        assert_eq!(file_label("Q1 2026/Stories"), "Q1_2026_Stories");
        assert_eq!(file_label("all_queries"), "all_queries");
    }
}
