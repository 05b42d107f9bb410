//! In-memory ontology store with hierarchy expansion.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::accessor::OntologyAccessor;
use crate::error::{Result, ValidatorError};

/// A single term in an in-memory ontology.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OntologyTerm {
    /// Stable accession (e.g. "GO:0005488").
    pub accession: String,
    /// Preferred name.
    pub name: String,
    /// Accessions of the direct parent terms.
    pub parents: Vec<String>,
}

impl OntologyTerm {
    /// Create a root term with no parents.
    pub fn new(accession: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            accession: accession.into(),
            name: name.into(),
            parents: Vec::new(),
        }
    }

    /// Add a parent accession.
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parents.push(parent.into());
        self
    }
}

/// One named ontology: its terms plus a child index for expansion.
#[derive(Debug, Clone, Default)]
struct Ontology {
    terms: HashMap<String, OntologyTerm>,
    children: HashMap<String, Vec<String>>,
}

/// An [`OntologyAccessor`] backed by terms held in memory.
///
/// Terms can be added programmatically or loaded from a minimal subset of
/// the OBO flat-file format (`[Term]` stanzas with `id:`, `name:` and
/// `is_a:` tags).
#[derive(Debug, Clone, Default)]
pub struct MemoryOntologyAccessor {
    ontologies: HashMap<String, Ontology>,
}

impl MemoryOntologyAccessor {
    /// Create an empty accessor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an ontology identifier, even if it has no terms yet.
    pub fn register_ontology(&mut self, id: impl Into<String>) {
        self.ontologies.entry(id.into()).or_default();
    }

    /// Add a term to an ontology, registering the ontology if needed.
    pub fn add_term(&mut self, ontology: impl Into<String>, term: OntologyTerm) {
        let entry = self.ontologies.entry(ontology.into()).or_default();
        for parent in &term.parents {
            entry
                .children
                .entry(parent.clone())
                .or_default()
                .push(term.accession.clone());
        }
        entry.terms.insert(term.accession.clone(), term);
    }

    /// Load `[Term]` stanzas from an OBO file into the given ontology.
    ///
    /// Only the `id:`, `name:` and `is_a:` tags are read; everything else
    /// in the stanza is ignored. Returns the number of terms loaded.
    pub fn load_obo_file(
        &mut self,
        ontology: &str,
        path: impl AsRef<Path>,
    ) -> Result<usize> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ValidatorError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let reader = BufReader::new(file);

        let mut current: Option<OntologyTerm> = None;
        let mut loaded = 0;

        for line in reader.lines() {
            let line = line.map_err(|source| ValidatorError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            let line = line.trim();

            if line == "[Term]" {
                if let Some(term) = current.take() {
                    self.add_term(ontology, term);
                    loaded += 1;
                }
            } else if let Some(id) = line.strip_prefix("id: ") {
                current = Some(OntologyTerm::new(id.trim(), ""));
            } else if let Some(ref mut term) = current {
                if let Some(name) = line.strip_prefix("name: ") {
                    term.name = name.trim().to_string();
                } else if let Some(is_a) = line.strip_prefix("is_a: ") {
                    // "is_a: GO:0005515 ! protein binding" -> keep the accession
                    if let Some(parent) = is_a.split_whitespace().next() {
                        term.parents.push(parent.to_string());
                    }
                }
            }
        }

        if let Some(term) = current {
            self.add_term(ontology, term);
            loaded += 1;
        }

        Ok(loaded)
    }

    /// All accessions strictly below `accession` in the hierarchy.
    fn descendants(&self, ontology: &Ontology, accession: &str) -> HashSet<String> {
        let mut seen = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        queue.push_back(accession);

        while let Some(current) = queue.pop_front() {
            if let Some(children) = ontology.children.get(current) {
                for child in children {
                    if seen.insert(child.clone()) {
                        queue.push_back(child);
                    }
                }
            }
        }

        seen
    }
}

impl OntologyAccessor for MemoryOntologyAccessor {
    fn contains_ontology(&self, id: &str) -> bool {
        self.ontologies.contains_key(id)
    }

    fn valid_accessions(
        &self,
        ontology: &str,
        accession: &str,
        allow_children: bool,
        use_term: bool,
    ) -> HashSet<String> {
        let Some(onto) = self.ontologies.get(ontology) else {
            return HashSet::new();
        };

        let mut out = HashSet::new();
        if use_term && onto.terms.contains_key(accession) {
            out.insert(accession.to_string());
        }
        if allow_children {
            out.extend(self.descendants(onto, accession));
        }
        out
    }

    fn preferred_name(&self, ontology: &str, accession: &str) -> Option<String> {
        self.ontologies
            .get(ontology)?
            .terms
            .get(accession)
            .map(|t| t.name.clone())
    }
}
