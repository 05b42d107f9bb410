//! The object-rule capability and the factory registry.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{Result, ValidatorError};
use crate::message::ValidatorMessage;
use crate::ontology::OntologyAccessor;

/// A pluggable validation unit over document objects.
///
/// Implementations are supplied by the embedding application; the engine
/// only instantiates, deduplicates and dispatches them. The identity is a
/// stable string the registry, the deduplication logic and exclusion lists
/// all agree on.
pub trait ObjectRule: Send + Sync {
    /// Stable implementation identity.
    fn identity(&self) -> &str;

    /// Whether this rule knows how to check the given object.
    fn can_check(&self, object: &Value) -> bool;

    /// Check the object, producing zero or more messages.
    fn check(&self, object: &Value) -> Result<Vec<ValidatorMessage>>;
}

impl std::fmt::Debug for dyn ObjectRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectRule")
            .field("identity", &self.identity())
            .finish()
    }
}

/// Factory closure constructing an object rule from an ontology accessor.
type RuleFactory =
    Box<dyn Fn(Arc<dyn OntologyAccessor>) -> std::result::Result<Box<dyn ObjectRule>, String> + Send + Sync>;

/// Registry mapping implementation identities to rule factories.
///
/// Populated at startup by the embedding application; this replaces
/// construction by reflected class name with an explicit lookup, so a
/// missing identity is a configuration error naming it.
#[derive(Default)]
pub struct RuleRegistry {
    factories: HashMap<String, RuleFactory>,
}

impl RuleRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under an identity. A later registration of the
    /// same identity replaces the earlier one.
    pub fn register<F>(&mut self, identity: impl Into<String>, factory: F)
    where
        F: Fn(Arc<dyn OntologyAccessor>) -> std::result::Result<Box<dyn ObjectRule>, String>
            + Send
            + Sync
            + 'static,
    {
        self.factories.insert(identity.into(), Box::new(factory));
    }

    /// Whether a factory is registered for the identity.
    pub fn contains(&self, identity: &str) -> bool {
        self.factories.contains_key(identity)
    }

    /// Construct the rule registered under `identity`.
    pub(crate) fn construct(
        &self,
        identity: &str,
        accessor: Arc<dyn OntologyAccessor>,
    ) -> Result<Box<dyn ObjectRule>> {
        let factory = self
            .factories
            .get(identity)
            .ok_or_else(|| ValidatorError::UnknownRuleIdentity(identity.to_string()))?;

        factory(accessor).map_err(|reason| ValidatorError::RuleConstruction {
            identity: identity.to_string(),
            reason,
        })
    }
}
