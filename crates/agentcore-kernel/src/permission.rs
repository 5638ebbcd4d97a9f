//! Permission Engine (§4.3): signature-based allow/deny/ask rule matching.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{KernelError, Result};
use crate::tool::ToolKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PermissionMode {
    Default,
    AutoEdit,
    Yolo,
    Plan,
}

impl Default for PermissionMode {
    fn default() -> Self {
        PermissionMode::Default
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PermissionResult {
    Allow,
    Deny,
    Ask,
}

#[derive(Debug, Clone)]
pub struct PermissionDecision {
    pub result: PermissionResult,
    pub matched_rule: Option<String>,
    pub reason: String,
}

impl PermissionDecision {
    fn new(result: PermissionResult, matched_rule: Option<String>, reason: impl Into<String>) -> Self {
        Self { result, matched_rule, reason: reason.into() }
    }
}

/// A parsed `ToolName` or `ToolName(pattern)` rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub raw: String,
    pub tool_name: String,
    pub pattern: Option<String>,
}

impl Rule {
    pub fn parse(raw: &str) -> Result<Self> {
        let raw_owned = raw.to_string();
        match raw.find('(') {
            None => Ok(Self { raw: raw_owned, tool_name: raw.to_string(), pattern: None }),
            Some(open) => {
                if !raw.ends_with(')') {
                    return Err(KernelError::InvalidRule {
                        rule: raw_owned,
                        reason: "unbalanced parentheses".to_string(),
                    });
                }
                let tool_name = raw[..open].to_string();
                let pattern = raw[open + 1..raw.len() - 1].to_string();
                if tool_name.is_empty() {
                    return Err(KernelError::InvalidRule { rule: raw_owned, reason: "empty tool name".to_string() });
                }
                Ok(Self { raw: raw_owned, tool_name, pattern: Some(pattern) })
            }
        }
    }

    /// Does this rule apply to an invocation with this tool name and
    /// (already-extracted) signature content?
    fn matches(&self, tool_name: &str, content: Option<&str>) -> bool {
        if self.tool_name != tool_name {
            return false;
        }
        match &self.pattern {
            None => true,
            Some(pattern) => match content {
                None => false,
                Some(content) => pattern_matches(pattern, content),
            },
        }
    }
}

/// §3/§4.3 pattern matching: `prefix:*` -> startsWith; `*`/`?` present ->
/// glob; else exact equality.
pub fn pattern_matches(pattern: &str, text: &str) -> bool {
    if let Some(prefix) = pattern.strip_suffix(":*") {
        return text.starts_with(prefix);
    }
    if pattern.contains('*') || pattern.contains('?') {
        return glob_match(pattern, text);
    }
    pattern == text
}

/// Minimal glob matcher (`*` = any run of characters, `?` = any single
/// character), anchored to the full string. Implemented by translating to an
/// anchored regex rather than depending on a dedicated glob crate, since the
/// permission engine only ever matches a handful of rules per invocation.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let mut regex_str = String::with_capacity(pattern.len() * 2 + 2);
    regex_str.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => regex_str.push_str(".*"),
            '?' => regex_str.push('.'),
            c => {
                regex_str.push_str(&regex::escape(&c.to_string()));
            }
        }
    }
    regex_str.push('$');
    match regex::Regex::new(&regex_str) {
        Ok(re) => re.is_match(text),
        Err(_) => false,
    }
}

/// Canonical `ToolName(content)` signature string (§3 `PermissionSignature`).
pub fn format_signature(tool_name: &str, content: Option<&str>) -> String {
    match content {
        Some(content) => format!("{tool_name}({content})"),
        None => tool_name.to_string(),
    }
}

/// Per-tool default signature-content extraction (§3).
pub fn default_signature_content(tool_name: &str, params: &Value) -> Option<String> {
    let key = match tool_name {
        "Bash" => "command",
        "Read" | "Write" | "Edit" => "file_path",
        "Glob" | "Grep" => "pattern",
        _ => return None,
    };
    params.get(key).and_then(Value::as_str).map(str::to_string)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleSet {
    #[serde(default)]
    pub allow: Vec<String>,
    #[serde(default)]
    pub deny: Vec<String>,
    #[serde(default)]
    pub ask: Vec<String>,
}

impl RuleSet {
    /// Ships in every fresh permission engine (§4.3 "Default rule set").
    pub fn defaults() -> Self {
        Self {
            allow: vec!["Read(**/*)".to_string(), "Glob(**/*)".to_string(), "Grep(**/*)".to_string()],
            deny: vec![
                "Bash(rm -rf:*)".to_string(),
                "Bash(sudo:*)".to_string(),
                "Write(/etc/*)".to_string(),
                "Write(/usr/*)".to_string(),
                "Write(/System/*)".to_string(),
            ],
            ask: Vec::new(),
        }
    }
}

/// What the permission engine needs to know about an invocation, decoupled
/// from [`crate::tool::ToolInvocation`] so this module has no dependency on
/// the tool registry.
#[derive(Debug, Clone)]
pub struct PermissionInvocation<'a> {
    pub tool_name: &'a str,
    pub kind: ToolKind,
    pub signature_content: Option<&'a str>,
}

pub struct PermissionEngine {
    allow: Vec<Rule>,
    deny: Vec<Rule>,
    ask: Vec<Rule>,
}

impl PermissionEngine {
    pub fn new(rules: RuleSet) -> Result<Self> {
        let parse_all = |raws: &[String]| raws.iter().map(|r| Rule::parse(r)).collect::<Result<Vec<_>>>();
        Ok(Self { allow: parse_all(&rules.allow)?, deny: parse_all(&rules.deny)?, ask: parse_all(&rules.ask)? })
    }

    pub fn with_defaults() -> Self {
        Self::new(RuleSet::defaults()).expect("built-in default rules are always well-formed")
    }

    fn first_match(rules: &[Rule], tool_name: &str, content: Option<&str>) -> Option<&Rule> {
        rules.iter().find(|r| r.matches(tool_name, content))
    }

    /// §4.3 algorithm: deny group first, then allow, then ask, each in
    /// declaration order; no match anywhere defaults to ASK. The mode
    /// overlay is applied afterward and can only move the result toward
    /// ALLOW (yolo, autoEdit) or force it to DENY (plan) -- it never
    /// overrides an explicit DENY rule match.
    pub fn evaluate(&self, inv: &PermissionInvocation<'_>, mode: PermissionMode) -> PermissionDecision {
        let content = inv.signature_content;

        if let Some(rule) = Self::first_match(&self.deny, inv.tool_name, content) {
            return PermissionDecision::new(PermissionResult::Deny, Some(rule.raw.clone()), "matched deny rule");
        }

        if mode == PermissionMode::Plan && inv.kind != ToolKind::ReadOnly {
            return PermissionDecision::new(PermissionResult::Deny, None, "plan mode forces non-read-only tools to deny");
        }

        let base = if let Some(rule) = Self::first_match(&self.allow, inv.tool_name, content) {
            PermissionDecision::new(PermissionResult::Allow, Some(rule.raw.clone()), "matched allow rule")
        } else if let Some(rule) = Self::first_match(&self.ask, inv.tool_name, content) {
            PermissionDecision::new(PermissionResult::Ask, Some(rule.raw.clone()), "matched ask rule")
        } else {
            PermissionDecision::new(PermissionResult::Ask, None, "no rule matched, defaulting to ask")
        };

        self.apply_mode_overlay(base, inv.kind, mode)
    }

    fn apply_mode_overlay(&self, decision: PermissionDecision, kind: ToolKind, mode: PermissionMode) -> PermissionDecision {
        if decision.result != PermissionResult::Ask {
            return decision;
        }
        match mode {
            PermissionMode::Yolo => PermissionDecision::new(PermissionResult::Allow, decision.matched_rule, "yolo mode promotes ask to allow"),
            PermissionMode::AutoEdit if matches!(kind, ToolKind::Edit | ToolKind::Write) => {
                PermissionDecision::new(PermissionResult::Allow, decision.matched_rule, "autoEdit mode promotes ask to allow for edit/write tools")
            }
            _ => decision,
        }
    }

    pub fn tighten(current: PermissionResult, proposed: PermissionResult) -> PermissionResult {
        use PermissionResult::*;
        let rank = |r: PermissionResult| match r {
            Allow => 0,
            Ask => 1,
            Deny => 2,
        };
        if rank(proposed) > rank(current) {
            proposed
        } else {
            current
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inv<'a>(tool_name: &'a str, kind: ToolKind, content: Option<&'a str>) -> PermissionInvocation<'a> {
        PermissionInvocation { tool_name, kind, signature_content: content }
    }

    #[test]
    fn rule_parse_plain() {
        let r = Rule::parse("Bash").unwrap();
        assert_eq!(r.tool_name, "Bash");
        assert_eq!(r.pattern, None);
    }

    #[test]
    fn rule_parse_with_pattern() {
        let r = Rule::parse("Bash(rm -rf:*)").unwrap();
        assert_eq!(r.tool_name, "Bash");
        assert_eq!(r.pattern.as_deref(), Some("rm -rf:*"));
    }

    #[test]
    fn rule_parse_unbalanced_errors() {
        assert!(Rule::parse("Bash(rm -rf").is_err());
    }

    #[test]
    fn pattern_prefix_match() {
        assert!(pattern_matches("rm -rf:*", "rm -rf /"));
        assert!(!pattern_matches("rm -rf:*", "ls -la"));
    }

    #[test]
    fn pattern_glob_match() {
        assert!(pattern_matches("**/*.rs", "src/lib.rs"));
        assert!(pattern_matches("*.rs", "lib.rs"));
        assert!(!pattern_matches("*.rs", "lib.toml"));
    }

    #[test]
    fn pattern_exact_match() {
        assert!(pattern_matches("ls", "ls"));
        assert!(!pattern_matches("ls", "ls -la"));
    }

    // S1 — deny overrides allow.
    #[test]
    fn s1_deny_overrides_allow() {
        let rules = RuleSet { allow: vec!["Bash(**/*)".to_string()], deny: vec!["Bash(rm -rf:*)".to_string()], ask: vec![] };
        let engine = PermissionEngine::new(rules).unwrap();
        let decision = engine.evaluate(&inv("Bash", ToolKind::Execute, Some("rm -rf /")), PermissionMode::Default);
        assert_eq!(decision.result, PermissionResult::Deny);
        assert_eq!(decision.matched_rule.as_deref(), Some("Bash(rm -rf:*)"));
    }

    #[test]
    fn default_rules_allow_read() {
        let engine = PermissionEngine::with_defaults();
        let decision = engine.evaluate(&inv("Read", ToolKind::ReadOnly, Some("/tmp/x")), PermissionMode::Default);
        assert_eq!(decision.result, PermissionResult::Allow);
    }

    #[test]
    fn default_rules_deny_sudo() {
        let engine = PermissionEngine::with_defaults();
        let decision = engine.evaluate(&inv("Bash", ToolKind::Execute, Some("sudo rm -rf /")), PermissionMode::Default);
        assert_eq!(decision.result, PermissionResult::Deny);
    }

    #[test]
    fn no_match_defaults_to_ask() {
        let engine = PermissionEngine::new(RuleSet::default()).unwrap();
        let decision = engine.evaluate(&inv("Write", ToolKind::Write, Some("/home/x")), PermissionMode::Default);
        assert_eq!(decision.result, PermissionResult::Ask);
    }

    #[test]
    fn yolo_promotes_ask_to_allow_but_not_deny() {
        let engine = PermissionEngine::with_defaults();
        let ask = engine.evaluate(&inv("Write", ToolKind::Write, Some("/home/x")), PermissionMode::Yolo);
        assert_eq!(ask.result, PermissionResult::Allow);

        let deny = engine.evaluate(&inv("Bash", ToolKind::Execute, Some("sudo rm -rf /")), PermissionMode::Yolo);
        assert_eq!(deny.result, PermissionResult::Deny);
    }

    #[test]
    fn plan_mode_forces_non_read_only_to_deny() {
        let engine = PermissionEngine::with_defaults();
        let decision = engine.evaluate(&inv("Edit", ToolKind::Edit, Some("/home/x")), PermissionMode::Plan);
        assert_eq!(decision.result, PermissionResult::Deny);

        let read_decision = engine.evaluate(&inv("Read", ToolKind::ReadOnly, Some("/home/x")), PermissionMode::Plan);
        assert_eq!(read_decision.result, PermissionResult::Allow);
    }

    #[test]
    fn auto_edit_promotes_ask_for_edit_and_write_only() {
        let engine = PermissionEngine::new(RuleSet::default()).unwrap();
        let edit = engine.evaluate(&inv("Edit", ToolKind::Edit, Some("/x")), PermissionMode::AutoEdit);
        assert_eq!(edit.result, PermissionResult::Allow);

        let exec = engine.evaluate(&inv("Bash", ToolKind::Execute, Some("ls")), PermissionMode::AutoEdit);
        assert_eq!(exec.result, PermissionResult::Ask);
    }

    #[test]
    fn tighten_never_loosens() {
        use PermissionResult::*;
        assert_eq!(PermissionEngine::tighten(Allow, Ask), Ask);
        assert_eq!(PermissionEngine::tighten(Ask, Allow), Ask);
        assert_eq!(PermissionEngine::tighten(Ask, Deny), Deny);
        assert_eq!(PermissionEngine::tighten(Deny, Allow), Deny);
    }

    #[test]
    fn default_signature_content_per_tool() {
        let params = serde_json::json!({"command": "ls -la", "file_path": "/tmp/x", "pattern": "*.rs"});
        assert_eq!(default_signature_content("Bash", &params).as_deref(), Some("ls -la"));
        assert_eq!(default_signature_content("Read", &params).as_deref(), Some("/tmp/x"));
        assert_eq!(default_signature_content("Grep", &params).as_deref(), Some("*.rs"));
        assert_eq!(default_signature_content("Echo", &params), None);
    }

    #[test]
    fn format_signature_includes_content_when_present() {
        assert_eq!(format_signature("Bash", Some("ls")), "Bash(ls)");
        assert_eq!(format_signature("Echo", None), "Echo");
    }
}
