use crate::error::{Result, WiqError};
use crate::paths;
use crate::work_item::fields;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// ProjectConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
}

// ---------------------------------------------------------------------------
// CacheConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_path")]
    pub path: PathBuf,
    /// Maximum ids per fetch request handed to the external fetch tool.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_cache_path() -> PathBuf {
    PathBuf::from(paths::DEFAULT_CACHE_FILE)
}

fn default_batch_size() -> usize {
    50
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: default_cache_path(),
            batch_size: default_batch_size(),
        }
    }
}

// ---------------------------------------------------------------------------
// AssessmentConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentConfig {
    /// Items starting more than this many days out are tagged "Prelim".
    #[serde(default = "default_prelim_days")]
    pub prelim_days: i64,
}

fn default_prelim_days() -> i64 {
    7
}

impl Default for AssessmentConfig {
    fn default() -> Self {
        Self {
            prelim_days: default_prelim_days(),
        }
    }
}

// ---------------------------------------------------------------------------
// ReportConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_reports_dir")]
    pub dir: PathBuf,
    /// Label used when query results are not grouped by query.
    #[serde(default = "default_label")]
    pub default_label: String,
}

fn default_reports_dir() -> PathBuf {
    PathBuf::from(paths::DEFAULT_REPORTS_DIR)
}

fn default_label() -> String {
    "all_queries".to_string()
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            dir: default_reports_dir(),
            default_label: default_label(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    pub project: ProjectConfig,
    /// Human-readable query label → saved query id (GUID).
    #[serde(default)]
    pub queries: BTreeMap<String, String>,
    /// Fields requested from the source for every work item.
    #[serde(default = "default_fields")]
    pub fields: Vec<String>,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub assessment: AssessmentConfig,
    #[serde(default)]
    pub reports: ReportConfig,
}

fn default_version() -> u32 {
    1
}

fn default_fields() -> Vec<String> {
    fields::REQUIRED.iter().map(|f| f.to_string()).collect()
}

static GUID_RE: OnceLock<Regex> = OnceLock::new();

fn guid_re() -> &'static Regex {
    GUID_RE.get_or_init(|| {
        Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
            .expect("static regex")
    })
}

impl Config {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            version: 1,
            project: ProjectConfig {
                name: project_name.into(),
                organization: None,
            },
            queries: BTreeMap::new(),
            fields: default_fields(),
            cache: CacheConfig::default(),
            assessment: AssessmentConfig::default(),
            reports: ReportConfig::default(),
        }
    }

    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(WiqError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    pub fn cache_path(&self, root: &Path) -> PathBuf {
        paths::resolve(root, &self.cache.path)
    }

    pub fn reports_dir(&self, root: &Path) -> PathBuf {
        paths::resolve(root, &self.reports.dir)
    }

    pub fn query_id(&self, label: &str) -> Result<&str> {
        self.queries
            .get(label)
            .map(String::as_str)
            .ok_or_else(|| WiqError::UnknownQuery(label.to_string()))
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.queries.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "no queries configured; expected ids must come from a file".to_string(),
            });
        }

        for (label, id) in &self.queries {
            if !guid_re().is_match(id) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("query '{label}' id '{id}' is not a GUID"),
                });
            }
            if label.trim().is_empty() || label.contains(['/', '\\']) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("query label '{label}' cannot be used in a report filename"),
                });
            }
        }

        for required in [fields::DESCRIPTION, fields::ACCEPTANCE_CRITERIA, fields::TITLE] {
            if !self.fields.iter().any(|f| f == required) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("field list is missing '{required}', which scoring reads"),
                });
            }
        }

        if self.cache.batch_size == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "cache.batch_size must be at least 1".to_string(),
            });
        }

        if self.assessment.prelim_days < 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "assessment.prelim_days={} tags every dated item as Prelim",
                    self.assessment.prelim_days
                ),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::new("test-project");
        let yaml = serde_yaml::to_string(&cfg).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.project.name, "test-project");
        assert_eq!(parsed.version, 1);
        assert_eq!(parsed.fields, cfg.fields);
    }

    #[test]
    fn minimal_config_gets_defaults() {
        let yaml = "project:\n  name: My Project\n";
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.version, 1);
        assert!(cfg.queries.is_empty());
        assert_eq!(cfg.cache.path, PathBuf::from(".wiq/cache.json"));
        assert_eq!(cfg.cache.batch_size, 50);
        assert_eq!(cfg.assessment.prelim_days, 7);
        assert_eq!(cfg.reports.default_label, "all_queries");
        assert!(cfg.fields.iter().any(|f| f == fields::DESCRIPTION));
    }

    #[test]
    fn queries_keep_label_order() {
        let yaml = r#"
project:
  name: My Project
queries:
  Q12026_Stories: 6f0d3c1e-1111-4a2b-9c3d-0123456789ab
  Q12026_Features: 0a1b2c3d-2222-4e5f-8a9b-abcdefabcdef
"#;
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        let labels: Vec<_> = cfg.queries.keys().cloned().collect();
        assert_eq!(labels, vec!["Q12026_Features", "Q12026_Stories"]);
        assert_eq!(
            cfg.query_id("Q12026_Features").unwrap(),
            "0a1b2c3d-2222-4e5f-8a9b-abcdefabcdef"
        );
        assert!(matches!(cfg.query_id("nope"), Err(WiqError::UnknownQuery(_))));
    }

    #[test]
    fn load_missing_is_not_initialized() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(Config::load(dir.path()), Err(WiqError::NotInitialized)));
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let mut cfg = Config::new("Proj");
        cfg.queries.insert(
            "Q1".to_string(),
            "0a1b2c3d-2222-4e5f-8a9b-abcdefabcdef".to_string(),
        );
        cfg.save(dir.path()).unwrap();
        let loaded = Config::load(dir.path()).unwrap();
        assert_eq!(loaded.queries.len(), 1);
        assert_eq!(loaded.cache_path(dir.path()), dir.path().join(".wiq/cache.json"));
    }

    #[test]
    fn validate_default_with_query_is_clean() {
        let mut cfg = Config::new("Proj");
        cfg.queries.insert(
            "Q1".to_string(),
            "0a1b2c3d-2222-4e5f-8a9b-abcdefabcdef".to_string(),
        );
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn validate_flags_bad_guid_and_missing_fields() {
        let mut cfg = Config::new("Proj");
        cfg.queries.insert("Q1".to_string(), "not-a-guid".to_string());
        cfg.fields.retain(|f| f != fields::DESCRIPTION);
        cfg.cache.batch_size = 0;
        let warnings = cfg.validate();
        assert!(warnings.iter().any(|w| w.message.contains("is not a GUID")));
        assert!(warnings
            .iter()
            .any(|w| w.level == WarnLevel::Error && w.message.contains(fields::DESCRIPTION)));
        assert!(warnings.iter().any(|w| w.message.contains("batch_size")));
    }

    #[test]
    fn validate_empty_queries_warns() {
        let cfg = Config::new("Proj");
        let warnings = cfg.validate();
        assert!(warnings.iter().any(|w| w.message.contains("no queries configured")));
    }
}
