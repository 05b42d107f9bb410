//! Path expression evaluation over document graphs.
//!
//! The rule engine consumes path evaluation through the [`PathEvaluator`]
//! trait and treats a compile failure as immediately terminal for the rule
//! invocation that hit it. [`SlashPathEvaluator`] is the bundled evaluator
//! over `serde_json::Value` graphs.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

/// Errors raised by path-expression evaluation.
///
/// Compile failures are recoverable at the rule layer: they become a
/// single skip-level message rather than aborting the validation run.
#[derive(Debug, Error)]
pub enum PathError {
    /// The expression cannot be compiled for the given graph shape.
    #[error("the path expression '{expr}' could not be compiled: {reason}")]
    Compile { expr: String, reason: String },
}

/// Evaluates a path expression against a document graph, returning zero or
/// more terminal values.
pub trait PathEvaluator: Send + Sync {
    /// Evaluate `expr` against `graph`.
    ///
    /// A missing element yields zero hits; only an uncompilable
    /// expression is an error.
    fn evaluate<'a>(
        &self,
        expr: &str,
        graph: &'a Value,
    ) -> std::result::Result<Vec<&'a Value>, PathError>;
}

static STEP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_.\-]*$").unwrap());

/// Default evaluator over JSON document graphs.
///
/// An expression is either empty, selecting the graph itself, or a
/// sequence of `/`-separated steps naming object fields. Arrays fan out at
/// any depth, so one expression can address every element of a repeated
/// node.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlashPathEvaluator;

impl SlashPathEvaluator {
    /// Split an expression into validated steps.
    fn compile<'e>(expr: &'e str) -> std::result::Result<Vec<&'e str>, PathError> {
        if expr.is_empty() {
            return Ok(Vec::new());
        }

        let Some(rest) = expr.strip_prefix('/') else {
            return Err(PathError::Compile {
                expr: expr.to_string(),
                reason: "expression must be empty or start with '/'".to_string(),
            });
        };

        let mut steps = Vec::new();
        for step in rest.split('/') {
            if !STEP_RE.is_match(step) {
                return Err(PathError::Compile {
                    expr: expr.to_string(),
                    reason: format!("invalid step '{step}'"),
                });
            }
            steps.push(step);
        }
        Ok(steps)
    }

    /// Descend one step from `node`, fanning out over arrays.
    fn descend<'a>(node: &'a Value, step: &str, out: &mut Vec<&'a Value>) {
        match node {
            Value::Object(map) => {
                if let Some(child) = map.get(step) {
                    Self::push_flat(child, out);
                }
            }
            Value::Array(items) => {
                for item in items {
                    Self::descend(item, step, out);
                }
            }
            _ => {}
        }
    }

    /// Push a value, flattening arrays into their elements.
    fn push_flat<'a>(value: &'a Value, out: &mut Vec<&'a Value>) {
        match value {
            Value::Array(items) => {
                for item in items {
                    Self::push_flat(item, out);
                }
            }
            other => out.push(other),
        }
    }
}

impl PathEvaluator for SlashPathEvaluator {
    fn evaluate<'a>(
        &self,
        expr: &str,
        graph: &'a Value,
    ) -> std::result::Result<Vec<&'a Value>, PathError> {
        let steps = Self::compile(expr)?;

        let mut current = vec![graph];
        for step in steps {
            let mut next = Vec::new();
            for node in current {
                Self::descend(node, step, &mut next);
            }
            current = next;
        }
        Ok(current)
    }
}
