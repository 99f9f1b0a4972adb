//! Core entity types: ontologies and the terms extracted from them.
//!
//! Both kinds are keyed by uri. Relationships between them are weak: a term
//! names its ontology and its parents by uri only, and any of those may be
//! absent from the repository.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Weight assigned to entities created without an explicit one.
pub const DEFAULT_WEIGHT: f64 = 1.0;

/// Seconds since the UNIX epoch.
pub fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// A named collection of term definitions, identified by its document uri.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ontology {
    pub uri: String,
    pub label: Option<String>,
    pub weight: f64,
    pub created_at: u64,
    pub updated_at: u64,
}

impl Ontology {
    /// Display name: the label when present and non-empty, otherwise the uri.
    pub fn display_name(&self) -> &str {
        match self.label.as_deref() {
            Some(label) if !label.is_empty() => label,
            _ => &self.uri,
        }
    }
}

/// A single class extracted from an ontology document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Term {
    pub uri: String,
    /// Weak reference to the owning ontology's uri.
    pub ontology: Option<String>,
    pub label: Option<String>,
    pub definition: Option<String>,
    /// Parent term uris. May dangle; cycles are allowed.
    pub sub_class_of: BTreeSet<String>,
    pub weight: f64,
    pub is_favorite: bool,
    pub created_at: u64,
    pub updated_at: u64,
}

impl Term {
    pub fn display_name(&self) -> &str {
        match self.label.as_deref() {
            Some(label) if !label.is_empty() => label,
            _ => &self.uri,
        }
    }
}

/// Ontology attributes as produced by extraction, before persistence.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OntologyDraft {
    pub uri: String,
    pub label: String,
    pub weight: Option<f64>,
}

impl OntologyDraft {
    pub fn new(uri: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            label: label.into(),
            weight: None,
        }
    }

    pub(crate) fn into_entity(self, now: u64) -> Ontology {
        Ontology {
            uri: self.uri,
            label: Some(self.label),
            weight: self.weight.unwrap_or(DEFAULT_WEIGHT),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Term attributes as produced by extraction, before persistence.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TermDraft {
    pub uri: String,
    pub ontology: Option<String>,
    pub label: String,
    pub definition: String,
    pub weight: Option<f64>,
}

impl TermDraft {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            ..Default::default()
        }
    }

    pub fn with_ontology(mut self, ontology: impl Into<String>) -> Self {
        self.ontology = Some(ontology.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_definition(mut self, definition: impl Into<String>) -> Self {
        self.definition = definition.into();
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    pub(crate) fn into_entity(self, now: u64) -> Term {
        Term {
            uri: self.uri,
            ontology: self.ontology,
            label: Some(self.label),
            definition: Some(self.definition),
            sub_class_of: BTreeSet::new(),
            weight: self.weight.unwrap_or(DEFAULT_WEIGHT),
            is_favorite: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Changes to the ranking inputs of a term. `None` leaves a field as is.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RankingPatch {
    pub weight: Option<f64>,
    pub is_favorite: Option<bool>,
}

impl RankingPatch {
    pub fn is_empty(&self) -> bool {
        self.weight.is_none() && self.is_favorite.is_none()
    }

    pub(crate) fn apply(&self, term: &mut Term, now: u64) {
        if let Some(weight) = self.weight {
            term.weight = weight;
        }
        if let Some(favorite) = self.is_favorite {
            term.is_favorite = favorite;
        }
        term.updated_at = now;
    }
}
