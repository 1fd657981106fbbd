use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default pairwise overlap above which two triggers count as rephrasings
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.7;
/// Default anti-trigger/description overlap above which a collision is flagged
pub const DEFAULT_COLLISION_THRESHOLD: f64 = 0.35;
pub const DEFAULT_MIN_TRIGGERS: usize = 5;
pub const DEFAULT_MIN_ANTI_TRIGGERS: usize = 3;
pub const DEFAULT_MIN_ACCEPTANCE_TESTS: usize = 3;
pub const DEFAULT_MAX_FILE_BYTES: u64 = 1024 * 1024;
pub const DEFAULT_SCRIPT_TIMEOUT_MS: u64 = 10_000;

/// Trigger analysis thresholds, as written in config files
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct TriggerConfig {
    #[serde(default)]
    pub similarity_threshold: Option<f64>,
    #[serde(default)]
    pub collision_threshold: Option<f64>,
    #[serde(default)]
    pub min_triggers: Option<usize>,
    #[serde(default)]
    pub min_anti_triggers: Option<usize>,
    #[serde(default)]
    pub min_acceptance_tests: Option<usize>,
}

/// Resolved trigger thresholds.
///
/// These are heuristic constants: they order phrases for human review and
/// do not predict activation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriggerThresholds {
    pub similarity: f64,
    pub collision: f64,
    pub min_triggers: usize,
    pub min_anti_triggers: usize,
    pub min_acceptance_tests: usize,
}

impl Default for TriggerThresholds {
    fn default() -> Self {
        Self {
            similarity: DEFAULT_SIMILARITY_THRESHOLD,
            collision: DEFAULT_COLLISION_THRESHOLD,
            min_triggers: DEFAULT_MIN_TRIGGERS,
            min_anti_triggers: DEFAULT_MIN_ANTI_TRIGGERS,
            min_acceptance_tests: DEFAULT_MIN_ACCEPTANCE_TESTS,
        }
    }
}

/// Security scan settings
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ScanConfig {
    /// Glob patterns (package-relative) excluded from tree walks
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub max_file_bytes: Option<u64>,
}

fn default_excludes() -> Vec<String> {
    vec![
        ".git/**".to_string(),
        "**/__pycache__/**".to_string(),
        "**/node_modules/**".to_string(),
        "**/.venv/**".to_string(),
    ]
}

/// External syntax checker settings
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ScriptsConfig {
    #[serde(default)]
    pub python: Option<String>,
    #[serde(default)]
    pub shell: Option<String>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

/// Extra words appended to the built-in tables
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct LexiconConfig {
    #[serde(default)]
    pub stop_words: Vec<String>,
    #[serde(default)]
    pub synonyms: Vec<Vec<String>>,
}

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub triggers: TriggerConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub scripts: ScriptsConfig,
    #[serde(default)]
    pub lexicon: LexiconConfig,
}

impl Config {
    /// Built-in defaults: only the default scan excludes are set
    pub fn with_defaults() -> Self {
        Config {
            scan: ScanConfig {
                exclude: default_excludes(),
                max_file_bytes: None,
            },
            ..Config::default()
        }
    }

    /// Load configuration from default paths
    /// Priority: explicit file > project (.skillcheck/config.toml) > user (~/.skillcheck/config.toml)
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = Self::with_defaults();

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".skillcheck").join("config.toml");
            if user_config.exists() {
                config.merge(Self::load_from(&user_config)?);
            }
        }

        let project_config = Path::new(".skillcheck").join("config.toml");
        if project_config.exists() {
            config.merge(Self::load_from(&project_config)?);
        }

        if let Some(path) = explicit {
            config.merge(Self::load_from(path)?);
        }

        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("cannot read {}: {}", path.display(), e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("invalid config {}: {}", path.display(), e))?;
        Ok(config)
    }

    /// Merge another config into this one (other takes priority)
    /// Scalars are overridden if set, lists are concatenated
    pub fn merge(&mut self, other: Config) {
        let t = other.triggers;
        if t.similarity_threshold.is_some() {
            self.triggers.similarity_threshold = t.similarity_threshold;
        }
        if t.collision_threshold.is_some() {
            self.triggers.collision_threshold = t.collision_threshold;
        }
        if t.min_triggers.is_some() {
            self.triggers.min_triggers = t.min_triggers;
        }
        if t.min_anti_triggers.is_some() {
            self.triggers.min_anti_triggers = t.min_anti_triggers;
        }
        if t.min_acceptance_tests.is_some() {
            self.triggers.min_acceptance_tests = t.min_acceptance_tests;
        }

        self.scan.exclude.extend(other.scan.exclude);
        if other.scan.max_file_bytes.is_some() {
            self.scan.max_file_bytes = other.scan.max_file_bytes;
        }

        if other.scripts.python.is_some() {
            self.scripts.python = other.scripts.python;
        }
        if other.scripts.shell.is_some() {
            self.scripts.shell = other.scripts.shell;
        }
        if other.scripts.timeout_ms.is_some() {
            self.scripts.timeout_ms = other.scripts.timeout_ms;
        }

        self.lexicon.stop_words.extend(other.lexicon.stop_words);
        self.lexicon.synonyms.extend(other.lexicon.synonyms);
    }

    /// Resolved trigger thresholds, falling back to the documented defaults
    pub fn thresholds(&self) -> TriggerThresholds {
        let d = TriggerThresholds::default();
        TriggerThresholds {
            similarity: self.triggers.similarity_threshold.unwrap_or(d.similarity),
            collision: self.triggers.collision_threshold.unwrap_or(d.collision),
            min_triggers: self.triggers.min_triggers.unwrap_or(d.min_triggers),
            min_anti_triggers: self.triggers.min_anti_triggers.unwrap_or(d.min_anti_triggers),
            min_acceptance_tests: self
                .triggers
                .min_acceptance_tests
                .unwrap_or(d.min_acceptance_tests),
        }
    }

    pub fn max_file_bytes(&self) -> u64 {
        self.scan.max_file_bytes.unwrap_or(DEFAULT_MAX_FILE_BYTES)
    }

    pub fn python_command(&self) -> &str {
        self.scripts.python.as_deref().unwrap_or("python3")
    }

    pub fn shell_command(&self) -> &str {
        self.scripts.shell.as_deref().unwrap_or("bash")
    }

    pub fn script_timeout_ms(&self) -> u64 {
        self.scripts.timeout_ms.unwrap_or(DEFAULT_SCRIPT_TIMEOUT_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::with_defaults();
        let t = config.thresholds();
        assert_eq!(t.similarity, DEFAULT_SIMILARITY_THRESHOLD);
        assert_eq!(t.min_triggers, 5);
        assert_eq!(config.max_file_bytes(), DEFAULT_MAX_FILE_BYTES);
        assert_eq!(config.python_command(), "python3");
        assert!(config.scan.exclude.iter().any(|p| p == ".git/**"));
    }

    #[test]
    fn test_parse_toml() {
        let config: Config = toml::from_str(
            r#"
[triggers]
similarity_threshold = 0.8
min_triggers = 3

[scan]
exclude = ["fixtures/**"]
max_file_bytes = 2048

[lexicon]
synonyms = [["k8s", "kubernetes"]]
"#,
        )
        .unwrap();
        assert_eq!(config.triggers.similarity_threshold, Some(0.8));
        assert_eq!(config.triggers.min_triggers, Some(3));
        assert_eq!(config.scan.exclude, vec!["fixtures/**"]);
        assert_eq!(config.lexicon.synonyms.len(), 1);
    }

    #[test]
    fn test_merge_overrides_scalars_and_extends_lists() {
        let mut base = Config::with_defaults();
        let other: Config = toml::from_str(
            r#"
[triggers]
collision_threshold = 0.5

[scan]
exclude = ["dist/**"]

[scripts]
python = "python3.12"
"#,
        )
        .unwrap();
        base.merge(other);

        let t = base.thresholds();
        assert_eq!(t.collision, 0.5);
        assert_eq!(t.similarity, DEFAULT_SIMILARITY_THRESHOLD);
        assert!(base.scan.exclude.iter().any(|p| p == ".git/**"));
        assert!(base.scan.exclude.iter().any(|p| p == "dist/**"));
        assert_eq!(base.python_command(), "python3.12");
        assert_eq!(base.shell_command(), "bash");
    }

    #[test]
    fn test_load_from_rejects_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[triggers\nbroken").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
