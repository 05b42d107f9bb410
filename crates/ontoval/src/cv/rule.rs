//! A single CV mapping rule and its evaluation.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::term::{CvTerm, RequirementLevel};
use crate::error::{Result, ValidatorError};
use crate::message::{Context, RuleRef, Severity, ValidatorMessage};
use crate::ontology::OntologyAccessor;
use crate::path::{PathError, PathEvaluator};

/// A declarative CV mapping: path expression, requirement level, allowed
/// terms. Never mutated after load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CvMappingRule {
    /// Absolute path expression to the values this rule constrains.
    pub element_path: String,
    /// Requirement level, which fixes the severity of every message.
    pub requirement_level: RequirementLevel,
    /// Allowed terms, in declaration order.
    pub terms: Vec<CvTerm>,
}

impl CvMappingRule {
    /// Create a mapping rule.
    pub fn new(
        element_path: impl Into<String>,
        requirement_level: RequirementLevel,
        terms: Vec<CvTerm>,
    ) -> Self {
        Self {
            element_path: element_path.into(),
            requirement_level,
            terms,
        }
    }
}

/// Cumulative outcome of a CV rule across a document run.
///
/// This is the consumer-facing summary reported by
/// [`Validator::report`](crate::Validator::report); the per-call match
/// counters never survive a `check` invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingStatus {
    /// The rule has not run since the last reset.
    Unchecked,
    /// Every check so far ran without producing a message.
    Passed,
    /// At least one check produced a message.
    Failed,
}

/// One CV mapping rule bound to an ontology accessor and a path evaluator.
pub struct CvRule {
    mapping: CvMappingRule,
    accessor: Arc<dyn OntologyAccessor>,
    evaluator: Arc<dyn PathEvaluator>,
    status: MappingStatus,
}

impl CvRule {
    pub(crate) fn new(
        mapping: CvMappingRule,
        accessor: Arc<dyn OntologyAccessor>,
        evaluator: Arc<dyn PathEvaluator>,
    ) -> Self {
        Self {
            mapping,
            accessor,
            evaluator,
            status: MappingStatus::Unchecked,
        }
    }

    /// The mapping this rule evaluates.
    pub fn mapping(&self) -> &CvMappingRule {
        &self.mapping
    }

    /// Cumulative status since the last reset.
    pub fn status(&self) -> MappingStatus {
        self.status
    }

    /// Clear the cumulative status.
    pub fn reset_status(&mut self) {
        self.status = MappingStatus::Unchecked;
    }

    /// Whether this rule applies at the given context path.
    ///
    /// An unset context means "evaluate at the rule's own absolute path".
    /// Otherwise this is a coarse structural test: the rule applies when
    /// its path literally starts with the context path.
    pub fn can_check(&self, context_path: Option<&str>) -> bool {
        match context_path {
            None => true,
            Some(ctx) => self.mapping.element_path.starts_with(ctx),
        }
    }

    /// The path to evaluate relative to the supplied object.
    fn effective_path(&self, context_path: Option<&str>) -> Result<&str> {
        match context_path {
            None => Ok(&self.mapping.element_path),
            Some(ctx) => self
                .mapping
                .element_path
                .strip_prefix(ctx)
                .ok_or_else(|| ValidatorError::ContextMismatch {
                    context: ctx.to_string(),
                    rule_path: self.mapping.element_path.clone(),
                }),
        }
    }

    fn rule_ref(&self) -> RuleRef {
        RuleRef::new(&self.mapping.element_path)
    }

    fn build_message(&self, path: &str, level: Severity, text: String) -> ValidatorMessage {
        ValidatorMessage::new(text, level, Context::new(path), self.rule_ref())
    }

    /// Check one object against this rule.
    ///
    /// `context_path` is the path from the document root to `object`; when
    /// set, the rule path must start with it. Fatal configuration errors
    /// (unregistered ontology, mismatched context) abort the whole call;
    /// everything else comes back as messages.
    pub fn check(
        &mut self,
        object: &Value,
        context_path: Option<&str>,
    ) -> Result<Vec<ValidatorMessage>> {
        let level = self.mapping.requirement_level.severity();
        let path = self.effective_path(context_path)?.to_string();

        let hits = match self.evaluator.evaluate(&path, object) {
            Ok(hits) => hits,
            Err(PathError::Compile { .. }) => {
                // Terminal for this invocation: one skip message, no hits.
                let message = self.build_message(
                    &path,
                    level,
                    format!("Skip this rule as the path expression could not be compiled: {path}"),
                );
                self.record_outcome(false);
                return Ok(vec![message]);
            }
        };

        // Absence of a matching node is not itself an error.
        if hits.is_empty() {
            self.record_outcome(true);
            return Ok(Vec::new());
        }

        let mut messages = Vec::new();
        let mut match_counts: HashMap<&CvTerm, u32> = HashMap::new();

        for hit in &hits {
            let Some(value) = hit.as_str() else {
                messages.push(self.build_message(
                    &path,
                    level,
                    format!(
                        "The value pointed to by the path ({path}) was not a CV term \
                         string as expected, instead: {}",
                        json_type_name(hit)
                    ),
                ));
                continue;
            };

            let mut found_one = false;
            for term in &self.mapping.terms {
                if self.term_matches(term, value)? {
                    // No early break: repeats of non-repeatable terms must
                    // still be counted across the remaining terms.
                    *match_counts.entry(term).or_insert(0) += 1;
                    found_one = true;
                } else {
                    log::trace!("no match between '{value}' and {}", term.render());
                }
            }

            if !found_one {
                let mut text = format!(
                    "None of the given CvTerms matched the target ({path}) '{value}':\n"
                );
                let mut terms = self.mapping.terms.iter().peekable();
                while let Some(term) = terms.next() {
                    text.push_str("  - ");
                    text.push_str(&term.render());
                    if terms.peek().is_some() {
                        text.push('\n');
                    }
                }
                messages.push(self.build_message(&path, level, text));
            }
        }

        // Read the counters exactly once, after all hits are processed.
        for term in &self.mapping.terms {
            if let Some(&count) = match_counts.get(term) {
                if count > 1 && !term.is_repeatable {
                    messages.push(self.build_message(
                        &path,
                        level,
                        format!(
                            "According to the CvMapping, the term '{}' wasn't meant to be \
                             repeated, yet it appeared {count} times in elements pointed \
                             out by the path expression: {path}",
                            term.accession
                        ),
                    ));
                }
            }
        }

        self.record_outcome(messages.is_empty());
        Ok(messages)
    }

    /// Whether `value` is in the allowed-value set of `term`.
    fn term_matches(&self, term: &CvTerm, value: &str) -> Result<bool> {
        if !self.accessor.contains_ontology(&term.ontology) {
            return Err(ValidatorError::UnknownOntology(term.ontology.clone()));
        }

        let accessions = self.accessor.valid_accessions(
            &term.ontology,
            &term.accession,
            term.allow_children,
            term.use_term,
        );

        if term.use_term_name {
            let names: HashSet<String> = accessions
                .iter()
                .filter_map(|acc| self.accessor.preferred_name(&term.ontology, acc))
                .collect();
            Ok(names.contains(value))
        } else {
            // Accession has precedence; names are ignored here.
            Ok(accessions.contains(value))
        }
    }

    /// Fold one check outcome into the cumulative status. Failed is sticky.
    fn record_outcome(&mut self, clean: bool) {
        if !clean {
            self.status = MappingStatus::Failed;
        } else if self.status == MappingStatus::Unchecked {
            self.status = MappingStatus::Passed;
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ontology::{MemoryOntologyAccessor, OntologyTerm};
    use crate::path::SlashPathEvaluator;
    use serde_json::json;

    fn accessor() -> Arc<MemoryOntologyAccessor> {
        let mut accessor = MemoryOntologyAccessor::new();
        accessor.add_term("GO", OntologyTerm::new("GO:0005488", "binding"));
        accessor.add_term(
            "GO",
            OntologyTerm::new("GO:0005515", "protein binding").with_parent("GO:0005488"),
        );
        Arc::new(accessor)
    }

    fn rule(mapping: CvMappingRule) -> CvRule {
        CvRule::new(mapping, accessor(), Arc::new(SlashPathEvaluator))
    }

    fn binding_children_rule(repeatable: bool) -> CvRule {
        rule(CvMappingRule::new(
            "/sample/cvParam",
            RequirementLevel::Must,
            vec![
                CvTerm::new("GO", "GO:0005488", "binding")
                    .with_allow_children(true)
                    .with_repeatable(repeatable),
            ],
        ))
    }

    #[test]
    fn test_can_check_prefix_semantics() {
        let rule = binding_children_rule(false);
        assert!(rule.can_check(None));
        assert!(rule.can_check(Some("/sample")));
        assert!(rule.can_check(Some("/sample/cvParam")));
        assert!(!rule.can_check(Some("/otherDoc")));
        // byte-wise, not segment-aware
        assert!(rule.can_check(Some("/sam")));
    }

    #[test]
    fn test_matching_child_produces_no_messages() {
        let mut rule = binding_children_rule(false);
        let graph = json!({"sample": {"cvParam": "GO:0005515"}});
        let messages = rule.check(&graph, None).unwrap();
        assert!(messages.is_empty());
        assert_eq!(rule.status(), MappingStatus::Passed);
    }

    #[test]
    fn test_unmatched_hit_enumerates_terms() {
        let mut rule = binding_children_rule(false);
        let graph = json!({"sample": {"cvParam": "XX:0000"}});
        let messages = rule.check(&graph, None).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].level(), Severity::Error);
        assert!(messages[0].message().contains("XX:0000"));
        assert!(messages[0].message().contains("GO:0005488"));
        assert_eq!(rule.status(), MappingStatus::Failed);
    }

    #[test]
    fn test_zero_hits_is_clean() {
        let mut rule = binding_children_rule(false);
        let graph = json!({"sample": {}});
        let messages = rule.check(&graph, None).unwrap();
        assert!(messages.is_empty());
    }

    #[test]
    fn test_repetition_reported_once_with_count() {
        let mut rule = binding_children_rule(false);
        let graph = json!({"sample": {"cvParam": ["GO:0005515", "GO:0005515"]}});
        let messages = rule.check(&graph, None).unwrap();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].message().contains("2 times"));
        assert!(messages[0].message().contains("GO:0005488"));
    }

    #[test]
    fn test_repeatable_term_allows_repeats() {
        let mut rule = binding_children_rule(true);
        let graph = json!({"sample": {"cvParam": ["GO:0005515", "GO:0005515"]}});
        let messages = rule.check(&graph, None).unwrap();
        assert!(messages.is_empty());
    }

    #[test]
    fn test_compile_failure_emits_single_skip_message() {
        let mut rule = rule(CvMappingRule::new(
            "sample/cvParam",
            RequirementLevel::Should,
            vec![CvTerm::new("GO", "GO:0005488", "binding").with_use_term(true)],
        ));
        let graph = json!({"sample": {"cvParam": "GO:0005488"}});
        let messages = rule.check(&graph, None).unwrap();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].message().contains("could not be compiled"));
        assert_eq!(messages[0].level(), Severity::Warning);
    }

    #[test]
    fn test_non_string_hit_reports_type_and_continues() {
        let mut rule = binding_children_rule(false);
        let graph = json!({"sample": {"cvParam": [42, "GO:0005515"]}});
        let messages = rule.check(&graph, None).unwrap();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].message().contains("number"));
    }

    #[test]
    fn test_unknown_ontology_aborts_rule() {
        let mut rule = rule(CvMappingRule::new(
            "/sample/cvParam",
            RequirementLevel::Must,
            vec![CvTerm::new("MOD", "MOD:00001", "mass delta").with_use_term(true)],
        ));
        let graph = json!({"sample": {"cvParam": "MOD:00001"}});
        let err = rule.check(&graph, None).unwrap_err();
        assert!(matches!(err, ValidatorError::UnknownOntology(ref id) if id == "MOD"));
    }

    #[test]
    fn test_context_path_strips_prefix() {
        let mut rule = binding_children_rule(false);
        // the object sits at /sample, so only /cvParam remains to evaluate
        let object = json!({"cvParam": "GO:0005515"});
        let messages = rule.check(&object, Some("/sample")).unwrap();
        assert!(messages.is_empty());
    }

    #[test]
    fn test_mismatched_context_is_fatal() {
        let mut rule = binding_children_rule(false);
        let object = json!({});
        let err = rule.check(&object, Some("/otherDoc")).unwrap_err();
        assert!(matches!(err, ValidatorError::ContextMismatch { .. }));
    }

    #[test]
    fn test_use_term_name_compares_names() {
        let mut rule = rule(CvMappingRule::new(
            "/sample/cvParam",
            RequirementLevel::Must,
            vec![
                CvTerm::new("GO", "GO:0005488", "binding")
                    .with_allow_children(true)
                    .with_use_term(true)
                    .with_use_term_name(true),
            ],
        ));
        let graph = json!({"sample": {"cvParam": "protein binding"}});
        let messages = rule.check(&graph, None).unwrap();
        assert!(messages.is_empty());

        // accessions are no longer acceptable values
        let graph = json!({"sample": {"cvParam": "GO:0005515"}});
        let messages = rule.check(&graph, None).unwrap();
        assert_eq!(messages.len(), 1);
    }

    #[test]
    fn test_status_is_sticky_until_reset() {
        let mut rule = binding_children_rule(false);
        let bad = json!({"sample": {"cvParam": "XX:0000"}});
        let good = json!({"sample": {"cvParam": "GO:0005515"}});

        rule.check(&bad, None).unwrap();
        assert_eq!(rule.status(), MappingStatus::Failed);
        rule.check(&good, None).unwrap();
        assert_eq!(rule.status(), MappingStatus::Failed);

        rule.reset_status();
        assert_eq!(rule.status(), MappingStatus::Unchecked);
        rule.check(&good, None).unwrap();
        assert_eq!(rule.status(), MappingStatus::Passed);
    }
}
