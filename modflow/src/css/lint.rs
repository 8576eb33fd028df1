//! Stylesheet linting.

use super::parser::{CssParseError, Declaration, Stylesheet};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

static ZERO_WITH_UNIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(^|[\s(,])0(px|em|rem|pt|pc|ex|ch|vh|vw|vmin|vmax|cm|mm|in)\b")
        .expect("zero-unit pattern is valid")
});

/// Severity of a lint message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Fails the lint gate.
    Error,
    /// Reported only.
    Warning,
    /// Informational.
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single finding reported by a linter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LintMessage {
    /// Message severity.
    pub severity: Severity,
    /// 1-based line.
    pub line: usize,
    /// 1-based column.
    pub column: usize,
    /// Human-readable message.
    pub text: String,
    /// The offending source line.
    #[serde(default)]
    pub evidence: String,
    /// Identifier of the rule that produced the message.
    #[serde(default)]
    pub rule: String,
}

impl LintMessage {
    /// Creates a message without evidence.
    #[must_use]
    pub fn new(severity: Severity, line: usize, column: usize, text: impl Into<String>) -> Self {
        Self {
            severity,
            line,
            column,
            text: text.into(),
            evidence: String::new(),
            rule: String::new(),
        }
    }

    /// Sets the rule identifier.
    #[must_use]
    pub fn with_rule(mut self, rule: impl Into<String>) -> Self {
        self.rule = rule.into();
        self
    }

    /// Sets the evidence line.
    #[must_use]
    pub fn with_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence = evidence.into();
        self
    }

    /// Returns true if the message has error severity.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Returns true if any message has error severity.
#[must_use]
pub fn has_errors(messages: &[LintMessage]) -> bool {
    messages.iter().any(LintMessage::is_error)
}

/// A CSS linter.
#[cfg_attr(test, mockall::automock)]
pub trait CssLinter: Send + Sync {
    /// Lints a stylesheet's source text.
    fn verify(&self, source: &str) -> Vec<LintMessage>;
}

/// The built-in rule set.
///
/// Errors: syntax errors and declarations without a value.
/// Warnings: empty rules, `!important`, duplicate properties and units on zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicLinter;

impl BasicLinter {
    /// Creates a new linter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl CssLinter for BasicLinter {
    fn verify(&self, source: &str) -> Vec<LintMessage> {
        let lines: Vec<&str> = source.lines().collect();
        let evidence = |line: usize| lines.get(line.saturating_sub(1)).map_or("", |l| l.trim()).to_string();

        let sheet = match Stylesheet::parse(source) {
            Ok(sheet) => sheet,
            Err(CssParseError { message, position }) => {
                return vec![LintMessage::new(Severity::Error, position.line, position.column, message)
                    .with_rule("syntax")
                    .with_evidence(evidence(position.line))];
            }
        };

        let mut messages = Vec::new();
        sheet.for_each_block(&mut |ctx, decls| {
            if decls.is_empty() && ctx.selector.is_some() {
                messages.push(
                    LintMessage::new(Severity::Warning, ctx.position.line, ctx.position.column, "Rule is empty.")
                        .with_rule("empty-rules")
                        .with_evidence(evidence(ctx.position.line)),
                );
            }
            check_declarations(decls, &mut messages, &evidence);
        });

        messages.sort_by_key(|m| (m.line, m.column));
        messages
    }
}

fn check_declarations(decls: &[Declaration], messages: &mut Vec<LintMessage>, evidence: &dyn Fn(usize) -> String) {
    let mut seen = HashSet::new();
    for decl in decls {
        let at = decl.position;
        let message = |severity, text: String, rule: &str| {
            LintMessage::new(severity, at.line, at.column, text)
                .with_rule(rule)
                .with_evidence(evidence(at.line))
        };

        if decl.value.is_empty() {
            messages.push(message(
                Severity::Error,
                format!("Expected a value for property '{}'.", decl.property),
                "empty-values",
            ));
        }
        if decl.important {
            messages.push(message(
                Severity::Warning,
                "Use of !important".to_string(),
                "important",
            ));
        }
        if !seen.insert(decl.name()) {
            messages.push(message(
                Severity::Warning,
                format!("Duplicate property '{}' found.", decl.property),
                "duplicate-properties",
            ));
        }
        if ZERO_WITH_UNIT.is_match(&decl.value) {
            messages.push(message(
                Severity::Warning,
                "Values of 0 shouldn't have units specified.".to_string(),
                "zero-units",
            ));
        }
    }
}
