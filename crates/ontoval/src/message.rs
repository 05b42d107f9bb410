//! Validator message data model.
//!
//! A [`ValidatorMessage`] is the sole externally visible output of a
//! validation call. Messages compare structurally over all four fields,
//! so callers can deduplicate or diff runs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity level of a validator message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational only, may not require action.
    Info,
    /// Potential issue that should be reviewed.
    Warning,
    /// Definite issue that should be addressed.
    Error,
}

impl Severity {
    /// Get a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Info => "Info",
            Severity::Warning => "Warning",
            Severity::Error => "Error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Location context of a message: the path expression that triggered it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Context {
    path: String,
}

impl Context {
    /// Create a context from a path expression.
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// The path expression this context points at.
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "context({})", self.path)
    }
}

/// Reference to the rule that produced a message.
///
/// CV rules are named by their element path, object rules by their
/// implementation identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleRef {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    scope: Option<String>,
}

impl RuleRef {
    /// Create a rule reference without a scope label.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scope: None,
        }
    }

    /// Attach the name of the configuration that introduced the rule.
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// The rule's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The scope label, if any.
    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }
}

impl fmt::Display for RuleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scope {
            Some(scope) => write!(f, "{} [{}]", self.name, scope),
            None => f.write_str(&self.name),
        }
    }
}

/// A single validation finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorMessage {
    message: String,
    level: Severity,
    context: Context,
    rule: RuleRef,
}

impl ValidatorMessage {
    /// Create a new message.
    pub fn new(
        message: impl Into<String>,
        level: Severity,
        context: Context,
        rule: RuleRef,
    ) -> Self {
        Self {
            message: message.into(),
            level,
            context,
            rule,
        }
    }

    /// The message text.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The message severity.
    pub fn level(&self) -> Severity {
        self.level
    }

    /// Where the message was raised.
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// The rule that raised the message.
    pub fn rule(&self) -> &RuleRef {
        &self.rule
    }
}

impl fmt::Display for ValidatorMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({}, rule {})",
            self.level, self.message, self.context, self.rule
        )
    }
}
