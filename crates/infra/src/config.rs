//! Engine configuration, read from the environment.

use std::path::PathBuf;

use buildledger_inventory::DEFAULT_MAX_BOM_DEPTH;

pub const MAX_BOM_DEPTH_VAR: &str = "BUILDLEDGER_MAX_BOM_DEPTH";
pub const SNAPSHOT_VAR: &str = "BUILDLEDGER_SNAPSHOT";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Recursion bound for requirements flattening.
    pub max_bom_depth: usize,
    /// Default ledger snapshot location.
    pub snapshot_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_bom_depth: DEFAULT_MAX_BOM_DEPTH,
            snapshot_path: None,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup; invalid values fall back to
    /// defaults with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup(MAX_BOM_DEPTH_VAR) {
            match raw.trim().parse::<usize>() {
                Ok(depth) if depth > 0 => config.max_bom_depth = depth,
                _ => tracing::warn!(
                    "{MAX_BOM_DEPTH_VAR}={raw:?} is not a positive integer; using {}",
                    config.max_bom_depth
                ),
            }
        }

        config.snapshot_path = lookup(SNAPSHOT_VAR)
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = EngineConfig::from_lookup(lookup(&[]));
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.max_bom_depth, DEFAULT_MAX_BOM_DEPTH);
    }

    #[test]
    fn reads_overrides() {
        let config = EngineConfig::from_lookup(lookup(&[
            (MAX_BOM_DEPTH_VAR, " 8 "),
            (SNAPSHOT_VAR, "/var/lib/ledger.json"),
        ]));
        assert_eq!(config.max_bom_depth, 8);
        assert_eq!(config.snapshot_path, Some(PathBuf::from("/var/lib/ledger.json")));
    }

    #[test]
    fn invalid_depth_falls_back_to_default() {
        for bad in ["0", "-1", "deep"] {
            let config = EngineConfig::from_lookup(lookup(&[(MAX_BOM_DEPTH_VAR, bad)]));
            assert_eq!(config.max_bom_depth, DEFAULT_MAX_BOM_DEPTH);
        }
    }
}
