//! Rule-set construction: recursive import resolution with scoped
//! exclusions, identity deduplication and collision diagnostics.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use reqwest::blocking::Client;
use serde::Serialize;
use sha2::{Digest, Sha256};

use super::descriptor::{ImportDirective, RuleListDescriptor, SourceKind};
use super::object::{ObjectRule, RuleRegistry};
use crate::error::{Result, ValidatorError};
use crate::message::{Context, RuleRef, Severity, ValidatorMessage};
use crate::ontology::OntologyAccessor;

/// One rule held by a rule set: the constructed rule plus the scope label
/// of the configuration that introduced it.
#[derive(Debug)]
struct RuleSetEntry {
    scope: String,
    rule: Box<dyn ObjectRule>,
}

/// The finalized, deduplicated set of object rules.
///
/// Unique by implementation identity; insertion is idempotent and the
/// first import wins, so iteration order is first-seen order.
#[derive(Default, Debug)]
pub struct RuleSet {
    entries: IndexMap<String, RuleSetEntry>,
}

impl RuleSet {
    /// Create an empty rule set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rules held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set holds no rules.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether a rule of the given identity is present.
    pub fn contains(&self, identity: &str) -> bool {
        self.entries.contains_key(identity)
    }

    /// The scope label retained for an identity, if present.
    pub fn scope_of(&self, identity: &str) -> Option<&str> {
        self.entries.get(identity).map(|e| e.scope.as_str())
    }

    /// The rules, in first-seen order.
    pub fn rules(&self) -> impl Iterator<Item = &dyn ObjectRule> {
        self.entries.values().map(|e| e.rule.as_ref())
    }

    /// (identity, scope, rule) triples, in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &dyn ObjectRule)> {
        self.entries
            .iter()
            .map(|(identity, e)| (identity.as_str(), e.scope.as_str(), e.rule.as_ref()))
    }

    /// Insert a rule unless its identity is already present.
    ///
    /// Returns false (and drops the rule) on a duplicate; the retained
    /// scope never changes.
    pub fn insert(
        &mut self,
        identity: impl Into<String>,
        scope: impl Into<String>,
        rule: Box<dyn ObjectRule>,
    ) -> bool {
        let identity = identity.into();
        if let Some(existing) = self.entries.get(&identity) {
            log::trace!(
                "the rule {identity} has already been added with scope '{}' and will \
                 not be reimported",
                existing.scope
            );
            return false;
        }
        self.entries.insert(
            identity,
            RuleSetEntry {
                scope: scope.into(),
                rule,
            },
        );
        true
    }
}

/// Record of one resolved import source, for provenance.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedImport {
    /// The locator as written in the directive.
    pub locator: String,
    /// Name of the configuration that imported it.
    pub imported_by: String,
    /// Where the source was actually found.
    pub kind: SourceKind,
    /// SHA-256 of the resolved bytes.
    pub hash: String,
}

/// Outcome of one top-level build.
#[derive(Debug)]
pub struct BuildReport {
    /// The finalized, deduplicated rule set.
    pub rules: RuleSet,
    /// Non-fatal diagnostics: excluded identities that nonetheless
    /// reached the final set through a sibling import.
    pub warnings: Vec<ValidatorMessage>,
    /// Every import resolved during the build, in resolution order.
    pub imports: Vec<ResolvedImport>,
    /// When the build finished.
    pub built_at: DateTime<Utc>,
}

/// Build-scoped mutable state threaded through the recursive import
/// resolution. Owned exclusively by one `build` call, never by the
/// builder itself, so independent builds cannot interfere.
#[derive(Default)]
struct BuildContext {
    rule_set: RuleSet,
    exclusion_stack: Vec<BTreeSet<String>>,
    ledger: HashMap<String, String>,
    recorded_exclusions: IndexMap<String, BTreeSet<String>>,
    warnings: Vec<ValidatorMessage>,
    imports: Vec<ResolvedImport>,
}

/// Resolves rule descriptors into a finalized [`RuleSet`].
///
/// Import sources are probed as embedded resources first, then local
/// files, then remote URLs; an explicit kind hint is tried first but a
/// failed hint falls through to the remaining probes.
pub struct RuleSetBuilder<'r> {
    registry: &'r RuleRegistry,
    accessor: Arc<dyn OntologyAccessor>,
    resources: HashMap<String, String>,
    http: Client,
}

impl<'r> RuleSetBuilder<'r> {
    /// Create a builder over a registry and an ontology accessor.
    pub fn new(registry: &'r RuleRegistry, accessor: Arc<dyn OntologyAccessor>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| ValidatorError::HttpClient(e.to_string()))?;

        Ok(Self {
            registry,
            accessor,
            resources: HashMap::new(),
            http,
        })
    }

    /// Register an embedded resource under a locator.
    pub fn with_resource(mut self, locator: impl Into<String>, text: impl Into<String>) -> Self {
        self.resources.insert(locator.into(), text.into());
        self
    }

    /// Run one top-level build over a descriptor.
    pub fn build(&self, descriptor: &RuleListDescriptor) -> Result<BuildReport> {
        let mut ctx = BuildContext::default();
        self.resolve(descriptor, &mut ctx)?;

        // Only meaningful at the outermost call: the stack has fully
        // unwound, so presence in the final set means a sibling import
        // reintroduced an identity that some import excluded.
        if !ctx.recorded_exclusions.is_empty() {
            self.check_recorded_exclusions(&mut ctx);
            ctx.recorded_exclusions.clear();
        }

        Ok(BuildReport {
            rules: ctx.rule_set,
            warnings: ctx.warnings,
            imports: ctx.imports,
            built_at: Utc::now(),
        })
    }

    /// Recursive resolution of one descriptor: imports first, in
    /// declaration order, then the directly declared rules.
    fn resolve(&self, descriptor: &RuleListDescriptor, ctx: &mut BuildContext) -> Result<()> {
        for import in &descriptor.imports {
            if let Some(first_importer) = ctx.ledger.get(&import.source) {
                log::warn!(
                    "the rules from '{}' have already been imported by '{first_importer}'; \
                     not importing them twice",
                    import.source
                );
                continue;
            }

            let pushed = Self::push_exclusions(import, ctx);

            // Recorded before recursing so that a cyclic import chain is
            // caught by the ledger instead of recursing forever.
            ctx.ledger
                .insert(import.source.clone(), descriptor.name.clone());

            let (text, kind) = self.resolve_source(import)?;
            ctx.imports.push(ResolvedImport {
                locator: import.source.clone(),
                imported_by: descriptor.name.clone(),
                kind,
                hash: sha256_hex(&text),
            });

            let child = RuleListDescriptor::from_json(&text).map_err(|source| {
                ValidatorError::DescriptorParse {
                    locator: import.source.clone(),
                    source,
                }
            })?;
            self.resolve(&child, ctx)?;

            if pushed {
                ctx.exclusion_stack.pop();
            }
        }

        for entry in &descriptor.rules {
            if ctx.rule_set.contains(&entry.identity) {
                log::trace!(
                    "the rule {} is already present with scope '{}'; keeping the first",
                    entry.identity,
                    ctx.rule_set.scope_of(&entry.identity).unwrap_or_default()
                );
                continue;
            }

            if ctx
                .exclusion_stack
                .last()
                .is_some_and(|top| top.contains(&entry.identity))
            {
                log::trace!("excluded rule at the current import scope: {}", entry.identity);
                continue;
            }

            let rule = self
                .registry
                .construct(&entry.identity, Arc::clone(&self.accessor))?;
            ctx.rule_set
                .insert(entry.identity.clone(), descriptor.name.clone(), rule);
            log::trace!("added rule: {}", entry.identity);
        }

        Ok(())
    }

    /// Merge a directive's exclusions with the enclosing scope and push
    /// them. Returns whether a set was pushed.
    fn push_exclusions(import: &ImportDirective, ctx: &mut BuildContext) -> bool {
        if import.exclude.is_empty() {
            return false;
        }

        let mut merged = ctx.exclusion_stack.last().cloned().unwrap_or_default();
        merged.extend(import.exclude.iter().cloned());

        ctx.recorded_exclusions
            .entry(import.source.clone())
            .or_insert_with(|| merged.clone());
        ctx.exclusion_stack.push(merged);
        true
    }

    /// Flag every excluded identity that nonetheless reached the final
    /// rule set: exclusion is scoped, so a sibling import can
    /// legitimately reintroduce a rule, but the user should know.
    fn check_recorded_exclusions(&self, ctx: &mut BuildContext) {
        for (locator, excluded) in &ctx.recorded_exclusions {
            for identity in excluded {
                if ctx.rule_set.contains(identity) {
                    log::warn!(
                        "the object rule {identity} was excluded by the import of \
                         '{locator}' but was imported from another file"
                    );
                    ctx.warnings.push(ValidatorMessage::new(
                        format!(
                            "The rule '{identity}' was excluded by the import of \
                             '{locator}' but reached the final rule set through \
                             another import; this may not be what you want"
                        ),
                        Severity::Warning,
                        Context::new(locator),
                        RuleRef::new(identity.clone()),
                    ));
                }
            }
        }
    }

    /// Resolve the bytes of an import source.
    ///
    /// The kind hint is probed first; a failed hint warns and falls
    /// through to the canonical resource -> file -> url chain.
    fn resolve_source(&self, import: &ImportDirective) -> Result<(String, SourceKind)> {
        let locator = import.source.as_str();

        match import.kind {
            SourceKind::Resource => {
                if let Some(text) = self.resources.get(locator) {
                    return Ok((text.clone(), SourceKind::Resource));
                }
                log::warn!(
                    "the source '{locator}' to import is declared as a resource but was \
                     not found; trying it as a local file, then as a URL"
                );
            }
            SourceKind::File => {
                if Path::new(locator).is_file() {
                    return Ok((self.read_file(locator)?, SourceKind::File));
                }
                log::warn!(
                    "the source '{locator}' to import is declared as a local file but \
                     was not found; trying it as a resource, then as a URL"
                );
            }
            SourceKind::Url => match self.fetch_url(locator) {
                Ok(text) => return Ok((text, SourceKind::Url)),
                Err(err) => {
                    log::warn!(
                        "the source '{locator}' to import is declared as a URL but could \
                         not be fetched ({err}); trying it as a resource, then as a \
                         local file"
                    );
                }
            },
            SourceKind::Unspecified => {
                log::warn!(
                    "no source kind given for the import '{locator}'; probing it as a \
                     resource, then as a local file, then as a URL"
                );
            }
        }

        if let Some(text) = self.resources.get(locator) {
            Ok((text.clone(), SourceKind::Resource))
        } else if Path::new(locator).is_file() {
            Ok((self.read_file(locator)?, SourceKind::File))
        } else {
            Ok((self.fetch_url(locator)?, SourceKind::Url))
        }
    }

    fn read_file(&self, locator: &str) -> Result<String> {
        std::fs::read_to_string(locator).map_err(|source| ValidatorError::Io {
            path: Path::new(locator).to_path_buf(),
            source,
        })
    }

    fn fetch_url(&self, locator: &str) -> Result<String> {
        let url = reqwest::Url::parse(locator)
            .map_err(|_| ValidatorError::MalformedLocator(locator.to_string()))?;

        self.http
            .get(url)
            .send()
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.text())
            .map_err(|e| ValidatorError::ImportUnresolvable {
                locator: locator.to_string(),
                detail: e.to_string(),
            })
    }
}

fn sha256_hex(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::message::ValidatorMessage;
    use crate::ontology::MemoryOntologyAccessor;
    use crate::rules::RuleEntry;
    use serde_json::{json, Value};

    struct MarkerRule {
        identity: &'static str,
    }

    impl ObjectRule for MarkerRule {
        fn identity(&self) -> &str {
            self.identity
        }

        fn can_check(&self, _object: &Value) -> bool {
            true
        }

        fn check(&self, _object: &Value) -> Result<Vec<ValidatorMessage>> {
            Ok(Vec::new())
        }
    }

    fn registry() -> RuleRegistry {
        let mut registry = RuleRegistry::new();
        for identity in ["RuleFoo", "RuleBar", "RuleBaz"] {
            registry.register(identity, move |_accessor| {
                Ok(Box::new(MarkerRule { identity }))
            });
        }
        registry
    }

    fn builder(registry: &RuleRegistry) -> RuleSetBuilder<'_> {
        RuleSetBuilder::new(registry, Arc::new(MemoryOntologyAccessor::new())).unwrap()
    }

    fn descriptor_json(value: Value) -> String {
        value.to_string()
    }

    #[test]
    fn test_direct_rules_get_descriptor_scope() {
        let registry = registry();
        let builder = builder(&registry);

        let descriptor = RuleListDescriptor::new("base")
            .with_rule(RuleEntry::new("RuleFoo"))
            .with_rule(RuleEntry::new("RuleBar"));

        let report = builder.build(&descriptor).unwrap();
        assert_eq!(report.rules.len(), 2);
        assert_eq!(report.rules.scope_of("RuleFoo"), Some("base"));
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_duplicate_identity_keeps_first_scope() {
        let registry = registry();
        let builder = builder(&registry).with_resource(
            "extra.json",
            descriptor_json(json!({
                "name": "extra",
                "rules": [{"identity": "RuleFoo"}]
            })),
        );

        let descriptor = RuleListDescriptor::new("base")
            .with_rule(RuleEntry::new("RuleFoo"))
            .with_import(ImportDirective::new("extra.json").with_kind(SourceKind::Resource));

        // imports resolve before direct rules, so "extra" wins the scope
        let report = builder.build(&descriptor).unwrap();
        assert_eq!(report.rules.len(), 1);
        assert_eq!(report.rules.scope_of("RuleFoo"), Some("extra"));
    }

    #[test]
    fn test_same_locator_imported_once() {
        let registry = registry();
        let builder = builder(&registry).with_resource(
            "shared.json",
            descriptor_json(json!({
                "name": "shared",
                "rules": [{"identity": "RuleFoo"}]
            })),
        );

        let descriptor = RuleListDescriptor::new("base")
            .with_import(ImportDirective::new("shared.json"))
            .with_import(ImportDirective::new("shared.json"));

        let report = builder.build(&descriptor).unwrap();
        assert_eq!(report.rules.len(), 1);
        assert_eq!(report.imports.len(), 1);
    }

    #[test]
    fn test_nested_exclusion_suppresses_rule_without_warning() {
        // base imports A (excludes RuleFoo), A imports B (declares RuleFoo)
        let registry = registry();
        let builder = builder(&registry)
            .with_resource(
                "a.json",
                descriptor_json(json!({
                    "name": "a",
                    "imports": [{"source": "b.json", "kind": "resource"}]
                })),
            )
            .with_resource(
                "b.json",
                descriptor_json(json!({
                    "name": "b",
                    "rules": [{"identity": "RuleFoo"}, {"identity": "RuleBar"}]
                })),
            );

        let descriptor = RuleListDescriptor::new("base").with_import(
            ImportDirective::new("a.json")
                .with_kind(SourceKind::Resource)
                .with_exclusion("RuleFoo"),
        );

        let report = builder.build(&descriptor).unwrap();
        assert!(!report.rules.contains("RuleFoo"));
        assert!(report.rules.contains("RuleBar"));
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_sibling_import_reintroduces_excluded_rule_with_warning() {
        // base imports A (excludes RuleFoo, declares nothing relevant) and,
        // separately, B (declares RuleFoo): exclusion is scoped to A, so
        // RuleFoo lands in the final set and the build flags the collision.
        let registry = registry();
        let builder = builder(&registry)
            .with_resource(
                "a.json",
                descriptor_json(json!({
                    "name": "a",
                    "rules": [{"identity": "RuleBar"}]
                })),
            )
            .with_resource(
                "b.json",
                descriptor_json(json!({
                    "name": "b",
                    "rules": [{"identity": "RuleFoo"}]
                })),
            );

        let descriptor = RuleListDescriptor::new("base")
            .with_import(
                ImportDirective::new("a.json")
                    .with_kind(SourceKind::Resource)
                    .with_exclusion("RuleFoo"),
            )
            .with_import(ImportDirective::new("b.json").with_kind(SourceKind::Resource));

        let report = builder.build(&descriptor).unwrap();
        assert!(report.rules.contains("RuleFoo"));
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].message().contains("RuleFoo"));
        assert_eq!(report.warnings[0].context().path(), "a.json");
    }

    #[test]
    fn test_nested_exclusions_merge_with_enclosing_scope() {
        // base imports A excluding RuleFoo; A imports B excluding RuleBar;
        // B declares all three: only RuleBaz survives.
        let registry = registry();
        let builder = builder(&registry)
            .with_resource(
                "a.json",
                descriptor_json(json!({
                    "name": "a",
                    "imports": [{"source": "b.json", "kind": "resource",
                                 "exclude": ["RuleBar"]}]
                })),
            )
            .with_resource(
                "b.json",
                descriptor_json(json!({
                    "name": "b",
                    "rules": [
                        {"identity": "RuleFoo"},
                        {"identity": "RuleBar"},
                        {"identity": "RuleBaz"}
                    ]
                })),
            );

        let descriptor = RuleListDescriptor::new("base").with_import(
            ImportDirective::new("a.json")
                .with_kind(SourceKind::Resource)
                .with_exclusion("RuleFoo"),
        );

        let report = builder.build(&descriptor).unwrap();
        assert!(!report.rules.contains("RuleFoo"));
        assert!(!report.rules.contains("RuleBar"));
        assert!(report.rules.contains("RuleBaz"));
    }

    #[test]
    fn test_exclusion_does_not_leak_to_sibling() {
        // the exclusion pushed for A must be popped before B resolves
        let registry = registry();
        let builder = builder(&registry)
            .with_resource(
                "a.json",
                descriptor_json(json!({"name": "a", "rules": []})),
            )
            .with_resource(
                "b.json",
                descriptor_json(json!({
                    "name": "b",
                    "rules": [{"identity": "RuleBar"}]
                })),
            );

        let descriptor = RuleListDescriptor::new("base")
            .with_import(
                ImportDirective::new("a.json")
                    .with_kind(SourceKind::Resource)
                    .with_exclusion("RuleBar"),
            )
            .with_import(ImportDirective::new("b.json").with_kind(SourceKind::Resource));

        let report = builder.build(&descriptor).unwrap();
        assert!(report.rules.contains("RuleBar"));
    }

    #[test]
    fn test_file_probe_reads_local_descriptor() {
        use std::io::Write;

        let registry = registry();
        let builder = builder(&registry);

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "{}",
            descriptor_json(json!({
                "name": "on-disk",
                "rules": [{"identity": "RuleFoo"}]
            }))
        )
        .unwrap();

        let locator = file.path().to_string_lossy().into_owned();
        let descriptor = RuleListDescriptor::new("base")
            .with_import(ImportDirective::new(&locator).with_kind(SourceKind::File));

        let report = builder.build(&descriptor).unwrap();
        assert!(report.rules.contains("RuleFoo"));
        assert_eq!(report.rules.scope_of("RuleFoo"), Some("on-disk"));
        assert_eq!(report.imports.len(), 1);
        assert_eq!(report.imports[0].kind, SourceKind::File);
        assert_eq!(report.imports[0].hash.len(), 64);
    }

    #[test]
    fn test_hinted_resource_falls_through_to_file() {
        use std::io::Write;

        let registry = registry();
        let builder = builder(&registry);

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "{}",
            descriptor_json(json!({
                "name": "on-disk",
                "rules": [{"identity": "RuleBar"}]
            }))
        )
        .unwrap();

        // declared as a resource, but only resolvable as a local file
        let locator = file.path().to_string_lossy().into_owned();
        let descriptor = RuleListDescriptor::new("base")
            .with_import(ImportDirective::new(&locator).with_kind(SourceKind::Resource));

        let report = builder.build(&descriptor).unwrap();
        assert!(report.rules.contains("RuleBar"));
        assert_eq!(report.imports[0].kind, SourceKind::File);
    }

    #[test]
    fn test_unresolvable_locator_is_fatal() {
        let registry = registry();
        let builder = builder(&registry);

        let descriptor = RuleListDescriptor::new("base")
            .with_import(ImportDirective::new("no such source"));

        let err = builder.build(&descriptor).unwrap_err();
        assert!(matches!(err, ValidatorError::MalformedLocator(_)));
    }

    #[test]
    fn test_unparseable_import_names_locator() {
        let registry = registry();
        let builder = builder(&registry).with_resource("bad.json", "not json at all");

        let descriptor = RuleListDescriptor::new("base")
            .with_import(ImportDirective::new("bad.json").with_kind(SourceKind::Resource));

        let err = builder.build(&descriptor).unwrap_err();
        match err {
            ValidatorError::DescriptorParse { locator, .. } => assert_eq!(locator, "bad.json"),
            other => panic!("expected DescriptorParse, got {other:?}"),
        }
    }

    #[test]
    fn test_excluded_rule_is_never_constructed() {
        // an excluded identity missing from the registry must not fail the
        // build, since its factory is never invoked
        let registry = registry();
        let builder = builder(&registry).with_resource(
            "a.json",
            descriptor_json(json!({
                "name": "a",
                "rules": [{"identity": "UnknownRule"}, {"identity": "RuleFoo"}]
            })),
        );

        let descriptor = RuleListDescriptor::new("base").with_import(
            ImportDirective::new("a.json")
                .with_kind(SourceKind::Resource)
                .with_exclusion("UnknownRule"),
        );

        let report = builder.build(&descriptor).unwrap();
        assert!(report.rules.contains("RuleFoo"));
        assert!(!report.rules.contains("UnknownRule"));
    }
}
