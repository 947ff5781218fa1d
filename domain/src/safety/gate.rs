//! Query safety gate
//!
//! Keyword/regex pre-filter applied before any backend call. The order of
//! checks is a security property: the blocklist always runs before the
//! allowlist, so an allowlist match can shortcut approval but never
//! bypass a block.

use crate::core::error::DomainError;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// Safety-gate configuration, loaded once at construction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyRules {
    /// Case-insensitive substrings that block a query
    #[serde(default)]
    pub blocked_keywords: Vec<String>,
    /// Regex patterns that block a query
    #[serde(default)]
    pub blocked_patterns: Vec<String>,
    /// Regex patterns that shortcut approval (after blocklist checks)
    #[serde(default)]
    pub allowlist_patterns: Vec<String>,
    /// Minimum accepted query length in characters
    #[serde(default = "default_min_query_length")]
    pub min_query_length: usize,
    /// Maximum accepted query length in characters
    #[serde(default = "default_max_query_length")]
    pub max_query_length: usize,
}

impl Default for SafetyRules {
    fn default() -> Self {
        Self {
            blocked_keywords: Vec::new(),
            blocked_patterns: Vec::new(),
            allowlist_patterns: Vec::new(),
            min_query_length: default_min_query_length(),
            max_query_length: default_max_query_length(),
        }
    }
}

fn default_min_query_length() -> usize {
    3
}

fn default_max_query_length() -> usize {
    1000
}

/// Gate verdict. Never persisted with the raw query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyResult {
    pub passed: bool,
    pub reason: String,
    pub matched_patterns: Vec<String>,
}

impl SafetyResult {
    fn blocked(reason: impl Into<String>, matched_patterns: Vec<String>) -> Self {
        Self {
            passed: false,
            reason: reason.into(),
            matched_patterns,
        }
    }

    fn passed(reason: impl Into<String>) -> Self {
        Self {
            passed: true,
            reason: reason.into(),
            matched_patterns: vec![],
        }
    }
}

/// Pre-filters queries using keyword and regex rules
pub struct SafetyGate {
    blocked_keywords: Vec<String>,
    blocked_patterns: Vec<Regex>,
    allowlist_patterns: Vec<Regex>,
    min_query_length: usize,
    max_query_length: usize,
}

impl SafetyGate {
    /// Compile the configured rules. Fails fast on an invalid regex.
    pub fn new(rules: &SafetyRules) -> Result<Self, DomainError> {
        Ok(Self {
            blocked_keywords: rules.blocked_keywords.clone(),
            blocked_patterns: compile_all(&rules.blocked_patterns)?,
            allowlist_patterns: compile_all(&rules.allowlist_patterns)?,
            min_query_length: rules.min_query_length,
            max_query_length: rules.max_query_length,
        })
    }

    /// Check whether a query is safe to process.
    ///
    /// Check order (must be preserved):
    /// 1. empty/whitespace, 2. length bounds, 3. blocked keywords,
    /// 4. blocked patterns, 5. allowlist, 6. default accept.
    pub fn check(&self, query: &str) -> SafetyResult {
        if query.trim().is_empty() {
            return SafetyResult::blocked("Query is empty", vec![]);
        }

        let query = query.trim();

        // Bounds are in characters, not bytes
        let length = query.chars().count();
        if length < self.min_query_length {
            return SafetyResult::blocked(
                format!("Query too short (min {} chars)", self.min_query_length),
                vec![],
            );
        }
        if length > self.max_query_length {
            return SafetyResult::blocked(
                format!("Query too long (max {} chars)", self.max_query_length),
                vec![],
            );
        }

        let query_lower = query.to_lowercase();
        for keyword in &self.blocked_keywords {
            if query_lower.contains(&keyword.to_lowercase()) {
                return SafetyResult::blocked(
                    format!("Blocked keyword detected: '{keyword}'"),
                    vec![keyword.clone()],
                );
            }
        }

        // All matching blocked patterns are reported, not just the first
        let matched: Vec<String> = self
            .blocked_patterns
            .iter()
            .filter(|p| p.is_match(query))
            .map(|p| p.as_str().to_string())
            .collect();
        if !matched.is_empty() {
            return SafetyResult::blocked("Blocked pattern matched", matched);
        }

        if self.allowlist_patterns.iter().any(|p| p.is_match(query)) {
            return SafetyResult::passed("Allowlisted query");
        }

        SafetyResult::passed("Query passed all safety checks")
    }

    /// Simple boolean check
    pub fn is_safe(&self, query: &str) -> bool {
        self.check(query).passed
    }
}

fn compile_all(patterns: &[String]) -> Result<Vec<Regex>, DomainError> {
    patterns
        .iter()
        .map(|pattern| {
            RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| DomainError::InvalidSafetyRule(format!("{pattern}: {e}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> SafetyGate {
        SafetyGate::new(&SafetyRules {
            blocked_keywords: vec!["explosive".to_string()],
            blocked_patterns: vec![
                r"how to (hack|exploit)".to_string(),
                r"bypass.*security".to_string(),
            ],
            allowlist_patterns: vec![r"for my (novel|research)".to_string()],
            min_query_length: 5,
            max_query_length: 100,
        })
        .unwrap()
    }

    #[test]
    fn test_empty_query_blocked() {
        let result = gate().check("   ");
        assert!(!result.passed);
        assert_eq!(result.reason, "Query is empty");
        assert!(result.matched_patterns.is_empty());
    }

    #[test]
    fn test_short_query_blocked_with_min_in_reason() {
        let result = gate().check("hi");
        assert!(!result.passed);
        assert_eq!(result.reason, "Query too short (min 5 chars)");
        assert!(result.matched_patterns.is_empty());
    }

    #[test]
    fn test_long_query_blocked() {
        let result = gate().check(&"x".repeat(200));
        assert!(!result.passed);
        assert_eq!(result.reason, "Query too long (max 100 chars)");
    }

    #[test]
    fn test_length_bounds_count_characters_not_bytes() {
        // 90 chars, 270 bytes: within the 100-char bound
        let multibyte = "日".repeat(90);
        assert_eq!(multibyte.len(), 270);
        assert!(gate().check(&multibyte).passed);

        // 4 chars, 12 bytes: still below the 5-char minimum
        let short = "日".repeat(4);
        let result = gate().check(&short);
        assert!(!result.passed);
        assert_eq!(result.reason, "Query too short (min 5 chars)");
    }

    #[test]
    fn test_blocked_keyword_case_insensitive() {
        let result = gate().check("Where can I buy an EXPLOSIVE device?");
        assert!(!result.passed);
        assert!(result.reason.contains("explosive"));
        assert_eq!(result.matched_patterns, vec!["explosive"]);
    }

    #[test]
    fn test_all_matching_patterns_reported() {
        let result = gate().check("how to hack and bypass the security system");
        assert!(!result.passed);
        assert_eq!(result.reason, "Blocked pattern matched");
        assert_eq!(result.matched_patterns.len(), 2);
    }

    #[test]
    fn test_allowlist_cannot_bypass_blocklist() {
        // Matches both a blocked keyword and an allowlist pattern:
        // blocklist wins
        let result = gate().check("explosive chemistry for my novel");
        assert!(!result.passed);
        assert!(result.reason.contains("explosive"));
    }

    #[test]
    fn test_allowlist_shortcuts_approval() {
        let result = gate().check("poison plot details for my novel");
        assert!(result.passed);
        assert_eq!(result.reason, "Allowlisted query");
    }

    #[test]
    fn test_clean_query_passes() {
        let result = gate().check("Should we adopt Rust for the backend?");
        assert!(result.passed);
        assert_eq!(result.reason, "Query passed all safety checks");
    }

    #[test]
    fn test_invalid_regex_fails_construction() {
        let rules = SafetyRules {
            blocked_patterns: vec!["(unclosed".to_string()],
            ..Default::default()
        };
        assert!(SafetyGate::new(&rules).is_err());
    }

    #[test]
    fn test_is_safe() {
        assert!(gate().is_safe("Should we adopt Rust?"));
        assert!(!gate().is_safe("how to hack a server"));
    }
}
