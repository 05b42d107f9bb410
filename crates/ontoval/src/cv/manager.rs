//! The CV rule manager: owns the full set of CV rules.

use std::sync::Arc;

use serde_json::Value;

use super::rule::{CvMappingRule, CvRule};
use crate::config::ValidatorConfig;
use crate::error::Result;
use crate::message::{Context, RuleRef, Severity, ValidatorMessage};
use crate::ontology::OntologyAccessor;
use crate::path::PathEvaluator;

/// Holds every CV rule of a validator, bound to one ontology accessor and
/// one path evaluator.
///
/// Rules are created once at configuration load and live as long as the
/// manager; only their cumulative status changes between resets.
pub struct CvRuleManager {
    accessor: Arc<dyn OntologyAccessor>,
    evaluator: Arc<dyn PathEvaluator>,
    rules: Vec<CvRule>,
}

impl CvRuleManager {
    /// Build a manager from an ordered sequence of mapping rules.
    pub fn new(
        accessor: Arc<dyn OntologyAccessor>,
        evaluator: Arc<dyn PathEvaluator>,
        mappings: Vec<CvMappingRule>,
    ) -> Self {
        let mut manager = Self {
            accessor,
            evaluator,
            rules: Vec::new(),
        };
        for mapping in mappings {
            manager.add_rule(mapping);
        }
        manager
    }

    /// Append one mapping rule.
    pub fn add_rule(&mut self, mapping: CvMappingRule) {
        self.rules.push(CvRule::new(
            mapping,
            Arc::clone(&self.accessor),
            Arc::clone(&self.evaluator),
        ));
    }

    /// The managed rules, in load order.
    pub fn rules(&self) -> &[CvRule] {
        &self.rules
    }

    /// Sanity-check the loaded mappings without evaluating any document.
    ///
    /// Lint findings come back as messages: a rule with no terms warns, a
    /// term referencing an unregistered ontology errors. Nothing here is
    /// fatal; the point is to surface configuration problems before a run.
    pub fn check_cv_mapping_rules(&self) -> Vec<ValidatorMessage> {
        let mut messages = Vec::new();

        for rule in &self.rules {
            let mapping = rule.mapping();
            let rule_ref = RuleRef::new(&mapping.element_path);

            if mapping.terms.is_empty() {
                messages.push(ValidatorMessage::new(
                    format!(
                        "The mapping rule for '{}' does not declare any CV term and can \
                         never match",
                        mapping.element_path
                    ),
                    Severity::Warning,
                    Context::new(&mapping.element_path),
                    rule_ref.clone(),
                ));
            }

            for term in &mapping.terms {
                if !self.accessor.contains_ontology(&term.ontology) {
                    messages.push(ValidatorMessage::new(
                        format!(
                            "The term '{}' references the ontology '{}' which is not \
                             registered",
                            term.accession, term.ontology
                        ),
                        Severity::Error,
                        Context::new(&mapping.element_path),
                        rule_ref.clone(),
                    ));
                }
            }
        }

        messages
    }

    /// Run every applicable rule against one object.
    ///
    /// With `config.success_reporting` set, a rule that ran cleanly also
    /// contributes one Info message.
    pub fn check_cv_mapping(
        &mut self,
        object: &Value,
        context_path: Option<&str>,
        config: &ValidatorConfig,
    ) -> Result<Vec<ValidatorMessage>> {
        let mut messages = Vec::new();

        for rule in &mut self.rules {
            if !rule.can_check(context_path) {
                continue;
            }
            let produced = rule.check(object, context_path)?;
            if produced.is_empty() && config.success_reporting {
                messages.push(ValidatorMessage::new(
                    format!(
                        "The mapping rule for '{}' was checked successfully",
                        rule.mapping().element_path
                    ),
                    Severity::Info,
                    Context::new(&rule.mapping().element_path),
                    RuleRef::new(&rule.mapping().element_path),
                ));
            }
            messages.extend(produced);
        }

        Ok(messages)
    }

    /// Clear the cumulative status of every rule.
    pub fn reset_status(&mut self) {
        for rule in &mut self.rules {
            rule.reset_status();
        }
    }
}
