//! The rule-descriptor model: named rule lists, import directives and
//! directly declared rule entries, parsed from JSON.

use serde::{Deserialize, Serialize};

/// Where an import directive should look for its source.
///
/// An unknown kind string degrades to [`Unspecified`](SourceKind::Unspecified):
/// the builder warns and probes every location in order instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// An embedded resource registered with the builder.
    Resource,
    /// A file on the local filesystem.
    File,
    /// A remote URL.
    Url,
    /// No usable hint; probe resource, then file, then url.
    #[default]
    #[serde(other)]
    Unspecified,
}

/// One import of another rule descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportDirective {
    /// Source locator: resource name, file path or URL.
    pub source: String,
    /// Optional hint about where the source lives.
    #[serde(default)]
    pub kind: SourceKind,
    /// Rule identities to exclude while resolving this import and every
    /// import nested inside it.
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl ImportDirective {
    /// Create a directive with no hint and no exclusions.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            kind: SourceKind::Unspecified,
            exclude: Vec::new(),
        }
    }

    /// Set the source-kind hint.
    pub fn with_kind(mut self, kind: SourceKind) -> Self {
        self.kind = kind;
        self
    }

    /// Add an excluded rule identity.
    pub fn with_exclusion(mut self, identity: impl Into<String>) -> Self {
        self.exclude.push(identity.into());
        self
    }
}

/// One directly declared rule entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleEntry {
    /// Implementation identity to construct.
    pub identity: String,
    /// Optional element path the rule is declared for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_path: Option<String>,
}

impl RuleEntry {
    /// Create an entry without a declared path.
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            element_path: None,
        }
    }
}

/// A named list of rules plus the imports it pulls in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleListDescriptor {
    /// Name of this configuration; becomes the scope of its rules.
    pub name: String,
    /// Imports, resolved in declaration order before the declared rules.
    #[serde(default)]
    pub imports: Vec<ImportDirective>,
    /// Directly declared rules.
    #[serde(default)]
    pub rules: Vec<RuleEntry>,
}

impl RuleListDescriptor {
    /// Create an empty descriptor.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            imports: Vec::new(),
            rules: Vec::new(),
        }
    }

    /// Add an import directive.
    pub fn with_import(mut self, import: ImportDirective) -> Self {
        self.imports.push(import);
        self
    }

    /// Add a declared rule.
    pub fn with_rule(mut self, rule: RuleEntry) -> Self {
        self.rules.push(rule);
        self
    }

    /// Parse a descriptor from JSON text.
    pub fn from_json(text: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_descriptor() {
        let text = r#"{
            "name": "base-rules",
            "imports": [
                {"source": "shared-rules.json", "kind": "resource",
                 "exclude": ["DeprecatedRule"]},
                {"source": "https://example.org/extra-rules.json", "kind": "url"}
            ],
            "rules": [
                {"identity": "SampleRule", "element_path": "/doc/sample"},
                {"identity": "InstrumentRule"}
            ]
        }"#;

        let descriptor = RuleListDescriptor::from_json(text).unwrap();
        assert_eq!(descriptor.name, "base-rules");
        assert_eq!(descriptor.imports.len(), 2);
        assert_eq!(descriptor.imports[0].kind, SourceKind::Resource);
        assert_eq!(descriptor.imports[0].exclude, vec!["DeprecatedRule"]);
        assert_eq!(descriptor.rules.len(), 2);
        assert_eq!(descriptor.rules[1].element_path, None);
    }

    #[test]
    fn test_missing_kind_defaults_to_unspecified() {
        let text = r#"{"name": "n", "imports": [{"source": "x.json"}]}"#;
        let descriptor = RuleListDescriptor::from_json(text).unwrap();
        assert_eq!(descriptor.imports[0].kind, SourceKind::Unspecified);
        assert!(descriptor.rules.is_empty());
    }

    #[test]
    fn test_unknown_kind_degrades_to_unspecified() {
        let text = r#"{"name": "n", "imports": [{"source": "x.json", "kind": "classpath"}]}"#;
        let descriptor = RuleListDescriptor::from_json(text).unwrap();
        assert_eq!(descriptor.imports[0].kind, SourceKind::Unspecified);
    }

    #[test]
    fn test_malformed_descriptor_fails() {
        assert!(RuleListDescriptor::from_json("{\"rules\": []}").is_err());
        assert!(RuleListDescriptor::from_json("not json").is_err());
    }
}
