//! Configuration builders for tests.
//!
//! Use [`TestConfigBuilder`] to create customised [`AppConfig`] values without
//! repeating boilerplate across crate boundaries.

use tagtree_config::{AppConfig, CyclePolicy};

/// Fluent builder for [`AppConfig`] in tests.
///
/// # Example
///
/// ```ignore
/// let config = TestConfigBuilder::new()
///     .source("catalog.json")
///     .cycle_policy(CyclePolicy::Truncate)
///     .build();
/// ```
pub struct TestConfigBuilder {
    config: AppConfig,
}

impl TestConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    pub fn source(mut self, source: &str) -> Self {
        self.config.registry.source = source.to_string();
        self
    }

    pub fn field_tag(mut self, tag: &str) -> Self {
        self.config.registry.field_tag = tag.to_string();
        self
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.config.registry.max_depth = Some(depth);
        self
    }

    pub fn cycle_policy(mut self, policy: CyclePolicy) -> Self {
        self.config.registry.cycle_policy = policy;
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.registry.timeout_secs = secs;
        self
    }

    pub fn log_level(mut self, level: &str) -> Self {
        self.config.logging.level = level.to_string();
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
