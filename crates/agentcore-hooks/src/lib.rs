//! External-command hook dispatcher (§4.4).

pub mod dispatcher;
pub mod error;
pub mod output;
pub mod types;

pub use dispatcher::{fold_post_tool_use, fold_pre_tool_use, HookDispatcher, HookInvocationResult};
pub use error::{HooksError, Result};
pub use output::{GenericOutput, HookOutput, PermissionDecisionHint, PermissionOutput, PostToolUseOutput, PreToolUseOutput};
pub use types::{matcher_matches, Behavior, HookConfig, HookEntry, HookEvent, MatchInput, Matcher, MatcherGroup};
