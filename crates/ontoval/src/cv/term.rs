//! Requirement levels and declared CV terms.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidatorError;
use crate::message::Severity;

/// Requirement level of a CV mapping rule.
///
/// The mapping to [`Severity`] is total and fixed: MAY is informational,
/// SHOULD warns, MUST errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequirementLevel {
    May,
    Should,
    Must,
}

impl RequirementLevel {
    /// The severity used for every message this rule produces.
    pub fn severity(&self) -> Severity {
        match self {
            RequirementLevel::May => Severity::Info,
            RequirementLevel::Should => Severity::Warning,
            RequirementLevel::Must => Severity::Error,
        }
    }

    /// The canonical spelling used in configuration files.
    pub fn as_str(&self) -> &'static str {
        match self {
            RequirementLevel::May => "MAY",
            RequirementLevel::Should => "SHOULD",
            RequirementLevel::Must => "MUST",
        }
    }
}

impl FromStr for RequirementLevel {
    type Err = ValidatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MAY" => Ok(RequirementLevel::May),
            "SHOULD" => Ok(RequirementLevel::Should),
            "MUST" => Ok(RequirementLevel::Must),
            other => Err(ValidatorError::UnknownRequirementLevel(other.to_string())),
        }
    }
}

/// One allowed-term declaration inside a CV mapping rule.
///
/// The term value itself is the identity used for match counting, so two
/// declarations of the same accession with different flags count
/// separately.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CvTerm {
    /// Identifier of the ontology the accession lives in.
    pub ontology: String,
    /// Term accession (e.g. "GO:0005488").
    pub accession: String,
    /// Preferred name of the declared term.
    pub name: String,
    /// Whether terms below the accession are allowed.
    #[serde(default)]
    pub allow_children: bool,
    /// Whether the accession itself is allowed.
    #[serde(default)]
    pub use_term: bool,
    /// Compare preferred names instead of accessions.
    #[serde(default)]
    pub use_term_name: bool,
    /// Whether more than one hit may match this term.
    #[serde(default)]
    pub is_repeatable: bool,
}

impl CvTerm {
    /// Create a term with all flags off.
    pub fn new(
        ontology: impl Into<String>,
        accession: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            ontology: ontology.into(),
            accession: accession.into(),
            name: name.into(),
            allow_children: false,
            use_term: false,
            use_term_name: false,
            is_repeatable: false,
        }
    }

    /// Allow terms below the accession.
    pub fn with_allow_children(mut self, allow: bool) -> Self {
        self.allow_children = allow;
        self
    }

    /// Allow the accession itself.
    pub fn with_use_term(mut self, use_term: bool) -> Self {
        self.use_term = use_term;
        self
    }

    /// Compare preferred names instead of accessions.
    pub fn with_use_term_name(mut self, use_name: bool) -> Self {
        self.use_term_name = use_name;
        self
    }

    /// Allow repeated matches of this term.
    pub fn with_repeatable(mut self, repeatable: bool) -> Self {
        self.is_repeatable = repeatable;
        self
    }

    /// Human-readable rendering used in unmatched-value messages.
    pub fn render(&self) -> String {
        format!(
            "CvTerm('{}', '{}', allowChildren:{}, useTerm:{}, repeatable:{})",
            self.accession, self.name, self.allow_children, self.use_term, self.is_repeatable
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_severity_mapping_is_total_and_fixed() {
        assert_eq!(RequirementLevel::May.severity(), Severity::Info);
        assert_eq!(RequirementLevel::Should.severity(), Severity::Warning);
        assert_eq!(RequirementLevel::Must.severity(), Severity::Error);
    }

    #[test]
    fn test_level_parsing() {
        assert_eq!("MAY".parse::<RequirementLevel>().unwrap(), RequirementLevel::May);
        assert_eq!("SHOULD".parse::<RequirementLevel>().unwrap(), RequirementLevel::Should);
        assert_eq!("MUST".parse::<RequirementLevel>().unwrap(), RequirementLevel::Must);
    }

    #[test]
    fn test_unknown_level_is_fatal() {
        let err = "OPTIONAL".parse::<RequirementLevel>().unwrap_err();
        assert!(matches!(
            err,
            crate::error::ValidatorError::UnknownRequirementLevel(ref s) if s == "OPTIONAL"
        ));
        // no default for lowercase spellings either
        assert!("must".parse::<RequirementLevel>().is_err());
    }

    #[test]
    fn test_term_defaults_and_identity() {
        let a = CvTerm::new("GO", "GO:0005488", "binding");
        assert!(!a.is_repeatable);
        assert!(!a.allow_children);

        let b = CvTerm::new("GO", "GO:0005488", "binding");
        assert_eq!(a, b);

        let c = b.clone().with_use_term(true);
        assert_ne!(a, c);
    }

    #[test]
    fn test_render() {
        let term = CvTerm::new("GO", "GO:0005488", "binding").with_allow_children(true);
        let rendered = term.render();
        assert!(rendered.contains("GO:0005488"));
        assert!(rendered.contains("binding"));
        assert!(rendered.contains("allowChildren:true"));
    }
}
