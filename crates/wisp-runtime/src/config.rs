//! Runtime configuration (JSON on disk).

use std::path::Path;

use serde::{Deserialize, Serialize};
use wisp_core::{Result, WispError};

/// Which executor runs kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Sequential,
    Parallel,
}

impl Default for BackendKind {
    fn default() -> Self {
        if cfg!(feature = "parallel") {
            Self::Parallel
        } else {
            Self::Sequential
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sequential => write!(f, "sequential"),
            Self::Parallel => write!(f, "parallel"),
        }
    }
}

/// Launch settings shared by every kernel dispatched through a [`Runtime`](crate::Runtime).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub backend: BackendKind,
    /// Logical threads per block on the parallel backend.
    pub block_dim: usize,
    /// Worker threads; `None` uses rayon's default (one per core).
    pub num_threads: Option<usize>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            block_dim: 256,
            num_threads: None,
        }
    }
}

impl RuntimeConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        tracing::debug!(path = %path.display(), backend = %config.backend, "loaded runtime config");
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.block_dim == 0 {
            return Err(WispError::Config("block_dim must be non-zero".into()));
        }
        if self.num_threads == Some(0) {
            return Err(WispError::Config("num_threads must be non-zero".into()));
        }
        if self.backend == BackendKind::Parallel && !cfg!(feature = "parallel") {
            return Err(WispError::Config(
                "parallel backend requested but the `parallel` feature is disabled".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.block_dim, 256);
        assert_eq!(config.num_threads, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = RuntimeConfig::from_json_str(r#"{"backend": "sequential"}"#).unwrap();
        assert_eq!(config.backend, BackendKind::Sequential);
        assert_eq!(config.block_dim, 256);
    }

    #[test]
    fn test_json_round_trip() {
        let config = RuntimeConfig {
            backend: BackendKind::Sequential,
            block_dim: 64,
            num_threads: Some(2),
        };
        let json = config.to_json_string().unwrap();
        assert_eq!(RuntimeConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            RuntimeConfig::from_json_str(r#"{"block_dim": 0}"#),
            Err(WispError::Config(_))
        ));
        assert!(matches!(
            RuntimeConfig::from_json_str(r#"{"num_threads": 0}"#),
            Err(WispError::Config(_))
        ));
        assert!(matches!(
            RuntimeConfig::from_json_str(r#"{"backend": "gpu"}"#),
            Err(WispError::Json(_))
        ));
    }
}
