//! Engine configuration (spec §6)
//!
//! A small, validated bundle of the options the external interface
//! exposes, built with the teacher's builder-plus-`validate`/`try_build`
//! pattern (its WAL config's `WalConfig`) rather than a constructor
//! with five positional booleans.

use graphkernel_core::error::{Error, Result};

/// Default dense-node threshold, matching the teacher's convention of
/// picking a round, documented default over a magic number.
pub const DEFAULT_DENSE_NODE_THRESHOLD: u32 = 50;

/// Engine-wide tunables (spec §6 "Configuration").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Chain length at which a node's relationships move into
    /// per-type relationship groups.
    pub dense_node_threshold: u32,
    /// Reject any call that would mutate a record store.
    pub read_only: bool,
    /// Run the integrity validator's consistency checks during apply.
    pub consistency_check_on_apply: bool,
    /// Use coarser, node-level locking for dense nodes instead of
    /// per-relationship-group locks.
    pub relaxed_locking_for_dense_nodes: bool,
    /// Allow exactly one automatic kernel-version upgrade per engine
    /// lifetime (spec §4.7).
    pub allow_single_automatic_upgrade: bool,
}

impl EngineConfig {
    /// Start building a config from defaults.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dense_node_threshold: DEFAULT_DENSE_NODE_THRESHOLD,
            read_only: false,
            consistency_check_on_apply: true,
            relaxed_locking_for_dense_nodes: false,
            allow_single_automatic_upgrade: true,
        }
    }
}

/// Builder for [`EngineConfig`].
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl Default for EngineConfigBuilder {
    fn default() -> Self {
        Self {
            config: EngineConfig::default(),
        }
    }
}

impl EngineConfigBuilder {
    /// Override the dense-node threshold.
    pub fn dense_node_threshold(mut self, value: u32) -> Self {
        self.config.dense_node_threshold = value;
        self
    }

    /// Open the engine read-only.
    pub fn read_only(mut self, value: bool) -> Self {
        self.config.read_only = value;
        self
    }

    /// Toggle the consistency-checking applier.
    pub fn consistency_check_on_apply(mut self, value: bool) -> Self {
        self.config.consistency_check_on_apply = value;
        self
    }

    /// Toggle relaxed locking for dense nodes.
    pub fn relaxed_locking_for_dense_nodes(mut self, value: bool) -> Self {
        self.config.relaxed_locking_for_dense_nodes = value;
        self
    }

    /// Toggle whether a single automatic upgrade is permitted.
    pub fn allow_single_automatic_upgrade(mut self, value: bool) -> Self {
        self.config.allow_single_automatic_upgrade = value;
        self
    }

    /// Validate and produce the final config.
    pub fn build(self) -> EngineConfig {
        self.config
    }

    /// Validate and produce the final config, rejecting a zero
    /// threshold (which would make every node dense on its first
    /// relationship).
    pub fn try_build(self) -> Result<EngineConfig> {
        if self.config.dense_node_threshold == 0 {
            return Err(Error::ConfigurationError(
                "dense_node_threshold must be at least 1".to_string(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable_out_of_the_box() {
        let config = EngineConfig::builder().build();
        assert_eq!(config.dense_node_threshold, DEFAULT_DENSE_NODE_THRESHOLD);
        assert!(!config.read_only);
        assert!(config.consistency_check_on_apply);
    }

    #[test]
    fn builder_overrides_apply() {
        let config = EngineConfig::builder()
            .dense_node_threshold(10)
            .read_only(true)
            .build();
        assert_eq!(config.dense_node_threshold, 10);
        assert!(config.read_only);
    }

    #[test]
    fn zero_threshold_is_rejected_by_try_build() {
        let result = EngineConfig::builder().dense_node_threshold(0).try_build();
        assert!(result.is_err());
    }
}
