//! The validator: owns a rule set and an optional CV rule manager,
//! dispatches validation calls and aggregates messages.

use serde::Serialize;
use serde_json::Value;

use crate::config::ValidatorConfig;
use crate::cv::{CvRuleManager, MappingStatus};
use crate::error::Result;
use crate::message::ValidatorMessage;
use crate::rules::RuleSet;

/// Counts of CV rules by cumulative status across a document run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ValidatorReport {
    pub total_rules: usize,
    pub passed: usize,
    pub failed: usize,
    pub unchecked: usize,
}

/// Validates document graphs against a set of object rules and an
/// optional set of CV mapping rules.
///
/// Construction wires in the finalized rule set and manager; after that
/// the rule definitions are read-only and only cumulative CV statuses
/// change between resets.
pub struct Validator {
    config: ValidatorConfig,
    rules: RuleSet,
    cv_rule_manager: Option<CvRuleManager>,
    warned_missing_cv_manager: bool,
}

impl Validator {
    /// Create a validator with no rules.
    pub fn new(config: ValidatorConfig) -> Self {
        Self {
            config,
            rules: RuleSet::new(),
            cv_rule_manager: None,
            warned_missing_cv_manager: false,
        }
    }

    /// Attach a finalized object rule set.
    pub fn with_rule_set(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }

    /// Attach a CV rule manager.
    pub fn with_cv_rule_manager(mut self, manager: CvRuleManager) -> Self {
        self.cv_rule_manager = Some(manager);
        self
    }

    /// The object rules held by this validator.
    pub fn object_rules(&self) -> &RuleSet {
        &self.rules
    }

    /// The CV rule manager, if one was configured.
    pub fn cv_rule_manager(&self) -> Option<&CvRuleManager> {
        self.cv_rule_manager.as_ref()
    }

    /// Validate a single object against every applicable object rule.
    pub fn validate(&self, object: &Value) -> Result<Vec<ValidatorMessage>> {
        let mut messages = Vec::new();
        for rule in self.rules.rules() {
            if rule.can_check(object) {
                messages.extend(rule.check(object)?);
            }
        }
        Ok(messages)
    }

    /// Validate a collection of objects against every applicable object rule.
    pub fn validate_all<'a, I>(&self, objects: I) -> Result<Vec<ValidatorMessage>>
    where
        I: IntoIterator<Item = &'a Value>,
    {
        let mut messages = Vec::new();
        for object in objects {
            messages.extend(self.validate(object)?);
        }
        Ok(messages)
    }

    /// Run the CV mapping check for one object.
    ///
    /// `context_path` is the path from the document root to the object;
    /// `None` means the object is the document root. Without a configured
    /// CV rule manager this logs a configuration error once and returns
    /// no messages.
    pub fn check_cv_mapping(
        &mut self,
        object: &Value,
        context_path: Option<&str>,
    ) -> Result<Vec<ValidatorMessage>> {
        let Some(manager) = self.cv_rule_manager.as_mut() else {
            if !self.warned_missing_cv_manager {
                log::error!("the CV rule manager has not been set up; skipping the CV mapping check");
                self.warned_missing_cv_manager = true;
            }
            return Ok(Vec::new());
        };
        manager.check_cv_mapping(object, context_path, &self.config)
    }

    /// Run the CV mapping check for a collection of objects.
    pub fn check_cv_mapping_all<'a, I>(
        &mut self,
        objects: I,
        context_path: Option<&str>,
    ) -> Result<Vec<ValidatorMessage>>
    where
        I: IntoIterator<Item = &'a Value>,
    {
        let mut messages = Vec::new();
        for object in objects {
            messages.extend(self.check_cv_mapping(object, context_path)?);
        }
        Ok(messages)
    }

    /// Lint the loaded CV mapping rules without touching any document.
    pub fn check_cv_mapping_rules(&self) -> Vec<ValidatorMessage> {
        match &self.cv_rule_manager {
            Some(manager) => manager.check_cv_mapping_rules(),
            None => {
                log::warn!("the CV rule manager has not been set up; nothing to check");
                Vec::new()
            }
        }
    }

    /// Clear the cumulative status of every CV rule, for the next
    /// full-document run.
    pub fn reset_cv_rule_status(&mut self) {
        if let Some(manager) = self.cv_rule_manager.as_mut() {
            manager.reset_status();
        }
    }

    /// Summarize CV rule outcomes since the last reset.
    pub fn report(&self) -> ValidatorReport {
        let mut report = ValidatorReport::default();
        if let Some(manager) = &self.cv_rule_manager {
            for rule in manager.rules() {
                report.total_rules += 1;
                match rule.status() {
                    MappingStatus::Passed => report.passed += 1,
                    MappingStatus::Failed => report.failed += 1,
                    MappingStatus::Unchecked => report.unchecked += 1,
                }
            }
        }
        report
    }
}
