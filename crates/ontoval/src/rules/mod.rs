//! Pluggable object rules: the trait, the registry that constructs them,
//! the descriptor model, and the rule-set builder that resolves imports.

mod builder;
mod descriptor;
mod object;

pub use builder::{BuildReport, ResolvedImport, RuleSet, RuleSetBuilder};
pub use descriptor::{ImportDirective, RuleEntry, RuleListDescriptor, SourceKind};
pub use object::{ObjectRule, RuleRegistry};
