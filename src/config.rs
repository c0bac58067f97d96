//
//  config.rs
//  RouteLens
//

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

use crate::error::{Result, RouteError};

/// Top-level RouteLens configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteConfig {
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

/// Scan and orchestration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// When the best strategy finds fewer endpoints than this and other
    /// strategies also apply, all applicable strategies run and merge.
    #[serde(default = "default_escalation_threshold")]
    pub escalation_threshold: usize,
    /// Below this many semantic results the annotation strategy also runs
    /// its textual pass.
    #[serde(default = "default_semantic_min_results")]
    pub semantic_min_results: usize,
    /// Bytes searched after a decorator for the routine it decorates.
    #[serde(default = "default_decorator_lookahead")]
    pub decorator_lookahead: usize,
    /// Extra ignore file honoured while walking, next to `.gitignore`.
    #[serde(default = "default_ignore_filename")]
    pub ignore_filename: String,
    /// Directory names skipped in addition to the built-in list.
    #[serde(default)]
    pub extra_ignored_dirs: Vec<String>,
    /// Upper bound on nested constant lookups for a single path expression.
    #[serde(default = "default_max_resolution_depth")]
    pub max_resolution_depth: usize,
}

/// Interactive search settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Maximum number of ranked results to return (None = all).
    #[serde(default)]
    pub limit: Option<usize>,
}

fn default_escalation_threshold() -> usize {
    3
}

fn default_semantic_min_results() -> usize {
    3
}

fn default_decorator_lookahead() -> usize {
    400
}

fn default_ignore_filename() -> String {
    ".routeignore".to_string()
}

fn default_max_resolution_depth() -> usize {
    32
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            escalation_threshold: default_escalation_threshold(),
            semantic_min_results: default_semantic_min_results(),
            decorator_lookahead: default_decorator_lookahead(),
            ignore_filename: default_ignore_filename(),
            extra_ignored_dirs: Vec::new(),
            max_resolution_depth: default_max_resolution_depth(),
        }
    }
}

impl RouteConfig {
    /// Load config from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_toml_str(&contents).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "ignoring invalid config");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Parse config from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| RouteError::InvalidConfig(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RouteConfig::default();
        assert_eq!(config.scan.escalation_threshold, 3);
        assert_eq!(config.scan.semantic_min_results, 3);
        assert_eq!(config.scan.ignore_filename, ".routeignore");
        assert!(config.search.limit.is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = RouteConfig::from_toml_str(
            "[scan]\nescalation_threshold = 5\n\n[search]\nlimit = 10\n",
        )
        .unwrap();
        assert_eq!(config.scan.escalation_threshold, 5);
        assert_eq!(config.scan.decorator_lookahead, 400);
        assert_eq!(config.search.limit, Some(10));
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        let err = RouteConfig::from_toml_str("[scan\nescalation_threshold = ").unwrap_err();
        assert!(matches!(err, RouteError::InvalidConfig(_)));
    }

    #[test]
    fn test_load_missing_file_falls_back() {
        let config = RouteConfig::load(Path::new("/definitely/not/here/routelens.toml"));
        assert_eq!(config.scan.max_resolution_depth, 32);
    }
}
