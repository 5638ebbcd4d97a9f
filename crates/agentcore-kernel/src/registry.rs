//! Name -> tool descriptor lookup.
//!
//! Backed by `DashMap` for lock-free concurrent reads, same choice as the
//! adapter registry this is modeled on: lookups happen on every pipeline
//! `discovery` stage and there is no reason to serialize them behind a
//! single mutex.

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;

use crate::error::{KernelError, Result};
use crate::tool::{Tool, ToolDescriptor};

pub struct ToolRegistry {
    tools: DashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: DashMap::new() }
    }

    pub fn register(&self, tool: Arc<dyn Tool>) -> Result<()> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(KernelError::DuplicateTool { tool_name: name });
        }
        tracing::debug!(tool = %name, "registered tool");
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Replace a tool's registration if present, insert otherwise.
    pub fn register_or_replace(&self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).map(|entry| Arc::clone(entry.value()))
    }

    pub fn descriptor(&self, name: &str) -> Result<ToolDescriptor> {
        self.get(name).map(|t| t.descriptor()).ok_or_else(|| KernelError::UnknownTool { tool_name: name.to_string() })
    }

    pub fn unregister(&self, name: &str) -> bool {
        self.tools.remove(name).is_some()
    }

    pub fn list_names(&self) -> Vec<String> {
        self.tools.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn list_descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(|entry| entry.value().descriptor()).collect()
    }

    pub fn count(&self) -> usize {
        self.tools.len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Permission signature content for an invocation: the tool's own
    /// extractor if it has one, else the per-tool-name default (§3).
    pub fn signature_content(&self, tool_name: &str, params: &Value) -> Option<String> {
        if let Some(tool) = self.get(tool_name) {
            if let Some(content) = tool.extract_signature_content(params) {
                return Some(content);
            }
        }
        crate::permission::default_signature_content(tool_name, params)
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result as KResult;
    use crate::tool::{ExecutionContext, Tool, ToolDescription, ToolDescriptor, ToolKind, ToolResult};
    use async_trait::async_trait;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "Echo"
        }

        fn descriptor(&self) -> ToolDescriptor {
            ToolDescriptor {
                name: "Echo".to_string(),
                kind: ToolKind::ReadOnly,
                description: ToolDescription::default(),
                input_schema: serde_json::json!({"type": "object"}),
            }
        }

        async fn execute(&self, params: Value, _ctx: &ExecutionContext) -> KResult<ToolResult> {
            Ok(ToolResult::ok(params.to_string()))
        }
    }

    #[test]
    fn register_and_get() {
        let reg = ToolRegistry::new();
        reg.register(Arc::new(EchoTool)).unwrap();
        assert!(reg.contains("Echo"));
        assert_eq!(reg.count(), 1);
        assert!(reg.get("Echo").is_some());
    }

    #[test]
    fn register_duplicate_errors() {
        let reg = ToolRegistry::new();
        reg.register(Arc::new(EchoTool)).unwrap();
        let err = reg.register(Arc::new(EchoTool));
        assert!(matches!(err, Err(KernelError::DuplicateTool { .. })));
    }

    #[test]
    fn descriptor_for_unknown_tool_errors() {
        let reg = ToolRegistry::new();
        let err = reg.descriptor("Nope");
        assert!(matches!(err, Err(KernelError::UnknownTool { .. })));
    }

    #[test]
    fn unregister_removes_tool() {
        let reg = ToolRegistry::new();
        reg.register(Arc::new(EchoTool)).unwrap();
        assert!(reg.unregister("Echo"));
        assert!(!reg.contains("Echo"));
        assert!(!reg.unregister("Echo"));
    }

    #[test]
    fn signature_content_falls_back_to_default() {
        let reg = ToolRegistry::new();
        reg.register(Arc::new(EchoTool)).unwrap();
        let params = serde_json::json!({"file_path": "/tmp/x"});
        // Echo has no dedicated default extractor rule -> falls back to tool name alone.
        assert_eq!(reg.signature_content("Echo", &params), None);
    }
}
