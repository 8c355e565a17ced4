// SPDX-License-Identifier: MIT
//
// Line Scoring Service
// Copyright (c) 2025 Line Scoring Service Contributors

//! Validation rule pipeline
//!
//! A [`RuleSet`] is an ordered list of [`Rule`]s. Evaluation stops at the first rule a
//! line fails and reports that rule's message, so the order of the rules decides which
//! message a line failing several rules gets back.

use std::fmt;

/// A named predicate over a line with a fixed rejection message
pub trait Rule: Send + Sync {
    /// Returns true if the line passes the rule
    fn evaluate(&self, line: &str) -> bool;

    /// Message reported when a line fails the rule
    fn message(&self) -> &str;
}

/// Rejects lines containing a substring
#[derive(Debug, Clone)]
pub struct ContainsRule {
    substring: String,
    ignore_case: bool,
    message: String,
}

impl ContainsRule {
    pub fn new(substring: impl Into<String>, message: impl Into<String>, ignore_case: bool) -> Self {
        let substring = substring.into();
        Self {
            substring: if ignore_case { substring.to_lowercase() } else { substring },
            ignore_case,
            message: message.into(),
        }
    }
}

impl Rule for ContainsRule {
    fn evaluate(&self, line: &str) -> bool {
        if self.ignore_case {
            !line.to_lowercase().contains(&self.substring)
        } else {
            !line.contains(&self.substring)
        }
    }

    fn message(&self) -> &str {
        &self.message
    }
}

/// Rejects lines starting with a prefix
#[derive(Debug, Clone)]
pub struct StartsWithRule {
    prefix: String,
    ignore_case: bool,
    message: String,
}

impl StartsWithRule {
    pub fn new(prefix: impl Into<String>, message: impl Into<String>, ignore_case: bool) -> Self {
        let prefix = prefix.into();
        Self {
            prefix: if ignore_case { prefix.to_lowercase() } else { prefix },
            ignore_case,
            message: message.into(),
        }
    }
}

impl Rule for StartsWithRule {
    fn evaluate(&self, line: &str) -> bool {
        if self.ignore_case {
            !line.to_lowercase().starts_with(&self.prefix)
        } else {
            !line.starts_with(&self.prefix)
        }
    }

    fn message(&self) -> &str {
        &self.message
    }
}

/// Ordered, immutable collection of rules
///
/// Built once at startup and shared read-only between connections.
#[derive(Default)]
pub struct RuleSet {
    rules: Vec<Box<dyn Rule>>,
}

impl RuleSet {
    pub fn new(rules: Vec<Box<dyn Rule>>) -> Self {
        Self { rules }
    }

    /// Message of the first rule the line fails, or `None` if it passes all of them
    pub fn evaluate(&self, line: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|rule| !rule.evaluate(line))
            .map(|rule| rule.message())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.rules.iter().map(|rule| rule.message()))
            .finish()
    }
}

impl FromIterator<Box<dyn Rule>> for RuleSet {
    fn from_iter<I: IntoIterator<Item = Box<dyn Rule>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Rejects lines longer than a limit
    struct MaxLengthRule(usize);

    impl Rule for MaxLengthRule {
        fn evaluate(&self, line: &str) -> bool {
            line.len() <= self.0
        }

        fn message(&self) -> &str {
            "Line too long"
        }
    }

    #[test]
    fn test_contains_rule_ignore_case() {
        let rule = ContainsRule::new("aa", "Double \"a\" rule detected", true);
        assert!(!rule.evaluate("xxaaxx"));
        assert!(!rule.evaluate("xxAaxx"));
        assert!(rule.evaluate("xaxax"));
    }

    #[test]
    fn test_contains_rule_case_sensitive() {
        let rule = ContainsRule::new("aa", "no aa", false);
        assert!(!rule.evaluate("baab"));
        assert!(rule.evaluate("bAAb"));
    }

    #[test]
    fn test_starts_with_rule() {
        let rule = StartsWithRule::new("ZZ", "starts with zz", true);
        assert!(!rule.evaluate("zz top"));
        assert!(rule.evaluate("top zz"));
    }

    #[test]
    fn test_empty_rule_set_accepts() {
        assert_eq!(RuleSet::default().evaluate("anything"), None);
    }

    #[test]
    fn test_first_failing_rule_wins() {
        let contains: Box<dyn Rule> = Box::new(ContainsRule::new("aa", "X", true));
        let too_long: Box<dyn Rule> = Box::new(MaxLengthRule(3));
        let rules = RuleSet::new(vec![contains, too_long]);
        assert_eq!(rules.evaluate("xxaaxx"), Some("X"));
        assert_eq!(rules.evaluate("bbbbbb"), Some("Line too long"));
        assert_eq!(rules.evaluate("ab"), None);

        let too_long: Box<dyn Rule> = Box::new(MaxLengthRule(3));
        let contains: Box<dyn Rule> = Box::new(ContainsRule::new("aa", "X", true));
        let reversed = RuleSet::new(vec![too_long, contains]);
        assert_eq!(reversed.evaluate("xxaaxx"), Some("Line too long"));
    }
}
