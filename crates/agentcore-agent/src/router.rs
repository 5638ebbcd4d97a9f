//! Model router (SPEC_FULL supplemented feature, §4.1 step 2 "active tool
//! schemas" extension point). Picks a model identifier per turn based on
//! estimated task complexity; wire-level provider details are out of scope
//! here; this only resolves "which model name to ask for."

use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfig {
    pub model: String,
    #[serde(default = "default_cost_tier")]
    pub cost_tier: u8,
}

fn default_cost_tier() -> u8 {
    1
}

impl ModelConfig {
    pub fn new(model: impl Into<String>, cost_tier: u8) -> Self {
        Self { model: model.into(), cost_tier }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Complexity {
    Simple,
    Medium,
    Complex,
}

/// Tiered model selection. Falls back through the hierarchy when a tier
/// isn't configured (§4.1's turn loop always needs *some* model name).
#[derive(Debug, Clone, Default)]
pub struct ModelRouter {
    simple: Option<ModelConfig>,
    medium: Option<ModelConfig>,
    complex: Option<ModelConfig>,
}

impl ModelRouter {
    pub fn new(simple: Option<ModelConfig>, medium: Option<ModelConfig>, complex: Option<ModelConfig>) -> Self {
        Self { simple, medium, complex }
    }

    pub fn single(config: ModelConfig) -> Self {
        Self { simple: Some(config.clone()), medium: Some(config.clone()), complex: Some(config) }
    }

    pub fn select(&self, complexity: Complexity) -> Result<&ModelConfig> {
        let primary = match complexity {
            Complexity::Simple => &self.simple,
            Complexity::Medium => &self.medium,
            Complexity::Complex => &self.complex,
        };
        primary
            .as_ref()
            .or(self.medium.as_ref())
            .or(self.complex.as_ref())
            .or(self.simple.as_ref())
            .ok_or_else(|| AgentError::Internal("no model configured for any complexity tier".to_string()))
    }

    /// Heuristic complexity estimate from the latest user input. A stand-in
    /// for a local classifier; good enough to pick a tier, not to grade.
    pub fn estimate_complexity(input: &str) -> Complexity {
        let word_count = input.split_whitespace().count();
        let has_code_markers = input.contains("```") || input.contains("fn ") || input.contains("class ") || input.contains("def ");
        let has_multi_step = input.contains(" and then ") || input.contains(" after that ") || input.contains(" step ") || input.contains(" steps ");
        let has_analysis_keywords =
            input.contains("analyze") || input.contains("compare") || input.contains("evaluate") || input.contains("synthesize") || input.contains("design") || input.contains("architect");

        if has_code_markers || has_analysis_keywords || (has_multi_step && word_count > 50) {
            Complexity::Complex
        } else if word_count > 30 || has_multi_step {
            Complexity::Medium
        } else {
            Complexity::Simple
        }
    }

    pub fn route(&self, input: &str) -> Result<&ModelConfig> {
        let complexity = Self::estimate_complexity(input);
        tracing::debug!(?complexity, "routed request to model tier");
        self.select(complexity)
    }
}
