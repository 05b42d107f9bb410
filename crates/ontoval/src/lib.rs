//! Ontoval: semantic validation of structured documents against
//! controlled-vocabulary constraints.
//!
//! Ontoval checks whether the values reachable by declarative path
//! expressions conform to ontology-backed term sets, and dispatches
//! pluggable object rules over arbitrary document graphs.
//!
//! # Core Principles
//!
//! - **Declarative**: CV mapping rules pair a path expression with the
//!   terms allowed at it; the engine does the matching
//! - **Composable**: rule sets are assembled from recursive imports with
//!   scoped exclusions and identity deduplication
//! - **Non-fatal findings**: validation violations accumulate as messages;
//!   only configuration errors abort a run
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use ontoval::{
//!     CvMappingRule, CvRuleManager, CvTerm, MemoryOntologyAccessor, OntologyTerm,
//!     RequirementLevel, SlashPathEvaluator, Validator, ValidatorConfig,
//! };
//!
//! let mut accessor = MemoryOntologyAccessor::new();
//! accessor.add_term("GO", OntologyTerm::new("GO:0005488", "binding"));
//!
//! let manager = CvRuleManager::new(
//!     Arc::new(accessor),
//!     Arc::new(SlashPathEvaluator),
//!     vec![CvMappingRule::new(
//!         "/sample/cvParam",
//!         RequirementLevel::Must,
//!         vec![CvTerm::new("GO", "GO:0005488", "binding").with_use_term(true)],
//!     )],
//! );
//!
//! let mut validator =
//!     Validator::new(ValidatorConfig::default()).with_cv_rule_manager(manager);
//! let document = serde_json::json!({"sample": {"cvParam": "GO:0005488"}});
//! let messages = validator.check_cv_mapping(&document, None).unwrap();
//! assert!(messages.is_empty());
//! ```

pub mod config;
pub mod cv;
pub mod error;
pub mod message;
pub mod ontology;
pub mod path;
pub mod rules;

mod validator;

pub use config::ValidatorConfig;
pub use cv::{CvMappingRule, CvRule, CvRuleManager, CvTerm, MappingStatus, RequirementLevel};
pub use error::{Result, ValidatorError};
pub use message::{Context, RuleRef, Severity, ValidatorMessage};
pub use ontology::{MemoryOntologyAccessor, OntologyAccessor, OntologyTerm};
pub use path::{PathError, PathEvaluator, SlashPathEvaluator};
pub use rules::{
    BuildReport, ImportDirective, ObjectRule, ResolvedImport, RuleEntry, RuleListDescriptor,
    RuleRegistry, RuleSet, RuleSetBuilder, SourceKind,
};
pub use validator::{Validator, ValidatorReport};
