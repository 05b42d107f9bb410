//! Controlled-vocabulary mapping rules.
//!
//! A [`CvMappingRule`] declares which ontology terms are allowed at the
//! values reachable by a path expression; a [`CvRule`] evaluates one such
//! mapping against a document graph; the [`CvRuleManager`] holds the full
//! set for a validator.

mod manager;
mod rule;
mod term;

pub use manager::CvRuleManager;
pub use rule::{CvMappingRule, CvRule, MappingStatus};
pub use term::{CvTerm, RequirementLevel};
