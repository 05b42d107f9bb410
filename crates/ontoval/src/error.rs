//! Error types for the ontoval library.
//!
//! Configuration errors are fatal and abort the current build or check.
//! Validation findings are never errors; they travel as
//! [`ValidatorMessage`](crate::ValidatorMessage) values instead. The
//! recoverable path-compile channel has its own type,
//! [`PathError`](crate::path::PathError).

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for ontoval operations.
#[derive(Debug, Error)]
pub enum ValidatorError {
    /// A requirement level string that is not MAY, SHOULD or MUST.
    #[error("unknown requirement level: '{0}'")]
    UnknownRequirementLevel(String),

    /// A CV term referenced an ontology that is not registered.
    #[error("the requested ontology was not found: {0}")]
    UnknownOntology(String),

    /// A context path was supplied that the rule path does not start with.
    #[error("context path '{context}' is not a prefix of the rule path '{rule_path}'")]
    ContextMismatch { context: String, rule_path: String },

    /// An import locator that is neither a resource, a file nor a parseable URL.
    #[error("the import locator '{0}' is malformed and cannot be read")]
    MalformedLocator(String),

    /// An import source that could not be resolved by any probe.
    #[error("the import source '{locator}' could not be resolved: {detail}")]
    ImportUnresolvable { locator: String, detail: String },

    /// A rule descriptor that could not be parsed.
    #[error("error parsing the rule descriptor from '{locator}'")]
    DescriptorParse {
        locator: String,
        #[source]
        source: serde_json::Error,
    },

    /// A declared rule identity with no registered factory.
    #[error("no object rule is registered for identity '{0}'")]
    UnknownRuleIdentity(String),

    /// A rule factory that failed to construct its rule.
    #[error("error constructing rule '{identity}': {reason}")]
    RuleConstruction { identity: String, reason: String },

    /// Error reading or accessing a file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failure to set up the HTTP client used for remote imports.
    #[error("failed to create HTTP client: {0}")]
    HttpClient(String),
}

/// Result type alias for ontoval operations.
pub type Result<T> = std::result::Result<T, ValidatorError>;
