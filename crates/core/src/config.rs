use crate::error::{IoContext, Result, ScanError};
use crate::reader::DEFAULT_CACHE_LIMIT;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_RESOURCE_PATTERN: &str = "**/*.class";

/// What a scan does when a descriptor cannot be decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeErrorPolicy {
    /// Fail the whole scan.
    #[default]
    Abort,
    /// Log, count and continue with the next resource.
    Skip,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Class-path roots: directories or `.jar`/`.zip`/`.war` archives.
    pub roots: Vec<PathBuf>,
    /// Appended to the package path by `find_candidates`.
    pub resource_pattern: String,
    /// Maximum cached readers; zero or less disables the cache.
    pub cache_limit: i64,
    pub decode_errors: DecodeErrorPolicy,
    /// Read descriptors on the rayon pool.
    pub parallel: bool,
    pub include_annotations: Vec<String>,
    pub exclude_annotations: Vec<String>,
    /// Regular expressions matched against the whole class name.
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            resource_pattern: DEFAULT_RESOURCE_PATTERN.to_string(),
            cache_limit: DEFAULT_CACHE_LIMIT,
            decode_errors: DecodeErrorPolicy::Abort,
            parallel: false,
            include_annotations: Vec::new(),
            exclude_annotations: Vec::new(),
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
        }
    }
}

impl ScanConfig {
    /// Reads a JSON config file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).with_location(&path.display().to_string())?;
        let config: ScanConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.resource_pattern.trim().is_empty() {
            return Err(ScanError::Config("resource_pattern must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ScanConfig::default();
        assert_eq!(config.resource_pattern, "**/*.class");
        assert_eq!(config.cache_limit, 256);
        assert_eq!(config.decode_errors, DecodeErrorPolicy::Abort);
        assert!(!config.parallel);
    }

    #[test]
    fn test_load_partial_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"roots": ["/tmp/classes"], "decode_errors": "skip", "include_annotations": ["a.Component"]}}"#
        )
        .unwrap();

        let config = ScanConfig::load(file.path()).unwrap();
        assert_eq!(config.roots, vec![PathBuf::from("/tmp/classes")]);
        assert_eq!(config.decode_errors, DecodeErrorPolicy::Skip);
        assert_eq!(config.include_annotations, vec!["a.Component".to_string()]);
        assert_eq!(config.cache_limit, 256);
    }

    #[test]
    fn test_load_rejects_bad_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(ScanConfig::load(file.path()), Err(ScanError::Json(_))));
    }

    #[test]
    fn test_load_rejects_empty_pattern() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"resource_pattern": " "}}"#).unwrap();
        assert!(matches!(ScanConfig::load(file.path()), Err(ScanError::Config(_))));
    }
}
