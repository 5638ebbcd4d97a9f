//! Configuration surface (§6, abridged). File loading and CLI parsing live
//! outside this crate; this is the schema those layers populate and the
//! conversions into the runtime types above.

use agentcore_hooks::HookConfig;
use agentcore_kernel::RuleSet;
use serde::{Deserialize, Serialize};

use crate::compaction::CompactionConfig;
use crate::turnloop::AgentConfig;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PermissionConfig {
    #[serde(default)]
    pub allow: Vec<String>,
    #[serde(default)]
    pub deny: Vec<String>,
    #[serde(default)]
    pub ask: Vec<String>,
}

impl From<PermissionConfig> for RuleSet {
    fn from(cfg: PermissionConfig) -> Self {
        RuleSet { allow: cfg.allow, deny: cfg.deny, ask: cfg.ask }
    }
}

/// Adds `maxMemorySize` to the compaction tunables (§6); that bound isn't
/// enforced anywhere else in this crate, it's carried through so a future
/// memory-file feature has somewhere to read it from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextConfig {
    pub max_context_tokens: u32,
    pub compression_threshold: f32,
    pub max_memory_size: u64,
    #[serde(default)]
    pub model: Option<String>,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self { max_context_tokens: 200_000, compression_threshold: 0.8, max_memory_size: 50 * 1024 * 1024, model: None }
    }
}

impl ContextConfig {
    pub fn compaction_config(&self) -> CompactionConfig {
        CompactionConfig {
            max_context_tokens: self.max_context_tokens,
            compression_threshold: self.compression_threshold,
            model: self.model.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitsConfig {
    /// `-1` means unlimited.
    pub max_turns: i64,
    pub max_output_tokens: Option<u32>,
    pub max_concurrent_hooks: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self { max_turns: 50, max_output_tokens: None, max_concurrent_hooks: 8 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeConfig {
    #[serde(default)]
    pub permissions: PermissionConfig,
    #[serde(default)]
    pub hooks: HookConfig,
    #[serde(default)]
    pub context: ContextConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub model: Option<String>,
}

impl RuntimeConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(input)
    }

    pub fn rule_set(&self) -> RuleSet {
        self.permissions.clone().into()
    }

    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig {
            max_turns: self.limits.max_turns,
            model: self.model.clone(),
            temperature: None,
            max_tokens: self.limits.max_output_tokens,
            model_router: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_limits_allow_unbounded_turns_via_negative_one() {
        let config = LimitsConfig { max_turns: -1, ..LimitsConfig::default() };
        assert_eq!(config.max_turns, -1);
    }

    #[test]
    fn empty_toml_document_uses_defaults() {
        let config = RuntimeConfig::from_toml_str("").unwrap();
        assert_eq!(config.limits.max_turns, 50);
        assert_eq!(config.context.max_context_tokens, 200_000);
    }

    #[test]
    fn parses_permission_rules_from_toml() {
        let toml = r#"
            [permissions]
            allow = ["Read(**/*)"]
            deny = ["Bash(rm -rf:*)"]

            [limits]
            maxTurns = -1
            maxConcurrentHooks = 4
        "#;
        let config = RuntimeConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.permissions.allow, vec!["Read(**/*)".to_string()]);
        assert_eq!(config.limits.max_turns, -1);
        assert_eq!(config.limits.max_concurrent_hooks, 4);
    }
}
