//! Core data model, tool registry, and permission engine.
//!
//! This is the leaf crate of the runtime: it depends on nothing else in the
//! workspace and everything else depends on it for `Message`, `ToolCall`,
//! the `Tool` trait, and permission evaluation.

pub mod cancellation;
pub mod error;
pub mod message;
pub mod permission;
pub mod registry;
pub mod tool;

pub use cancellation::CancellationHandle;
pub use error::{KernelError, Result};
pub use message::{Message, Role, ToolCall};
pub use permission::{
    default_signature_content, format_signature, glob_match, pattern_matches, PermissionDecision, PermissionEngine,
    PermissionInvocation, PermissionMode, PermissionResult, Rule, RuleSet,
};
pub use registry::ToolRegistry;
pub use tool::{ExecutionContext, Tool, ToolDescription, ToolDescriptor, ToolInvocation, ToolKind, ToolResult, ToolResultError};
