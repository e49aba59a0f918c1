// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use serde::{Deserialize, Serialize};

/// Runtime tuning knobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Worker count used when fanning out over entrypoints.
    pub concurrency: usize,
    /// Whether a failed field computation is cached like a value.
    pub cache_errors: bool,
    /// Maximum chunk resolution depth before execution gives up.
    pub max_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            concurrency: 5,
            cache_errors: true,
            max_depth: 1024,
        }
    }
}

impl Config {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.concurrency == 0 {
            anyhow::bail!("concurrency must be at least 1");
        }
        if self.max_depth == 0 {
            anyhow::bail!("maxDepth must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() -> anyhow::Result<()> {
        let config = Config::from_json(r#"{ "concurrency": 2 }"#)?;
        assert_eq!(config.concurrency, 2);
        assert!(config.cache_errors);
        assert_eq!(config.max_depth, 1024);
        Ok(())
    }

    #[test]
    fn zero_concurrency_rejected() {
        let err = Config::from_json(r#"{ "concurrency": 0 }"#).unwrap_err();
        assert!(err.to_string().contains("concurrency"));
    }
}
