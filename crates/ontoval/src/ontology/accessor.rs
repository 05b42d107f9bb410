//! The ontology access contract consumed by the rule engine.

use std::collections::HashSet;

/// Read-only access to named, hierarchical controlled vocabularies.
///
/// Implementations must be safe for concurrent reads: a single accessor is
/// shared across every rule of a validator, and distinct documents may be
/// validated from distinct threads.
pub trait OntologyAccessor: Send + Sync {
    /// Whether an ontology with the given identifier is registered.
    fn contains_ontology(&self, id: &str) -> bool;

    /// The set of accessions that are valid matches for a term.
    ///
    /// `use_term` includes the accession itself, `allow_children` includes
    /// every accession reachable below it. An accession unknown to the
    /// ontology yields the empty set. Callers are expected to gate on
    /// [`contains_ontology`](Self::contains_ontology) first; an
    /// unregistered ontology identifier is a configuration error at the
    /// rule layer, not here.
    fn valid_accessions(
        &self,
        ontology: &str,
        accession: &str,
        allow_children: bool,
        use_term: bool,
    ) -> HashSet<String>;

    /// The preferred name for an accession, if the term exists.
    fn preferred_name(&self, ontology: &str, accession: &str) -> Option<String>;
}
