//! Keyed entity storage for ontologies and terms.
//!
//! Two backends implement [`Repository`]:
//!
//! - [`MemRepository`]: concurrent hashmaps (DashMap), lost on exit
//! - [`DurableRepository`]: ACID transactions on disk (redb)
//!
//! Both guarantee that racing upserts on one uri create exactly one entity and
//! that [`Repository::set_parents_if_empty`] is an atomic check-and-set.

pub mod durable;
pub mod mem;

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::model::{Ontology, OntologyDraft, RankingPatch, Term, TermDraft};

pub use durable::DurableRepository;
pub use mem::MemRepository;

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// An entity returned by an upsert, and whether this call created it.
#[derive(Debug, Clone, PartialEq)]
pub struct Upserted<T> {
    pub entity: T,
    pub created: bool,
}

impl<T> Upserted<T> {
    pub fn created(entity: T) -> Self {
        Self {
            entity,
            created: true,
        }
    }

    pub fn existing(entity: T) -> Self {
        Self {
            entity,
            created: false,
        }
    }
}

/// What an upsert does when the uri already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpsertPolicy {
    /// Return the stored entity untouched; supplied attributes are discarded.
    /// Re-ingesting an updated document never refreshes stale labels.
    #[default]
    InsertOnly,
    /// Overwrite label, definition and owning ontology with the supplied ones.
    ReplaceOnConflict,
    /// Fill only stored fields that are missing or empty.
    MergeFields,
}

impl UpsertPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InsertOnly => "insert-only",
            Self::ReplaceOnConflict => "replace-on-conflict",
            Self::MergeFields => "merge-fields",
        }
    }

    /// Apply the policy to a stored ontology. Returns whether it changed.
    pub(crate) fn apply_ontology(
        self,
        stored: &mut Ontology,
        draft: &OntologyDraft,
        now: u64,
    ) -> bool {
        let changed = match self {
            Self::InsertOnly => false,
            Self::ReplaceOnConflict => {
                let mut changed = replace(&mut stored.label, &draft.label);
                if let Some(weight) = draft.weight {
                    changed |= stored.weight != weight;
                    stored.weight = weight;
                }
                changed
            }
            Self::MergeFields => fill(&mut stored.label, &draft.label),
        };
        if changed {
            stored.updated_at = now;
        }
        changed
    }

    /// Apply the policy to a stored term. Returns whether it changed.
    ///
    /// Ranking inputs (favorite flag) and resolved parents are never touched.
    pub(crate) fn apply_term(self, stored: &mut Term, draft: &TermDraft, now: u64) -> bool {
        let changed = match self {
            Self::InsertOnly => false,
            Self::ReplaceOnConflict => {
                let mut changed = replace(&mut stored.label, &draft.label);
                changed |= replace(&mut stored.definition, &draft.definition);
                if draft.ontology.is_some() && stored.ontology != draft.ontology {
                    stored.ontology = draft.ontology.clone();
                    changed = true;
                }
                if let Some(weight) = draft.weight {
                    changed |= stored.weight != weight;
                    stored.weight = weight;
                }
                changed
            }
            Self::MergeFields => {
                let mut changed = fill(&mut stored.label, &draft.label);
                changed |= fill(&mut stored.definition, &draft.definition);
                if stored.ontology.is_none() && draft.ontology.is_some() {
                    stored.ontology = draft.ontology.clone();
                    changed = true;
                }
                changed
            }
        };
        if changed {
            stored.updated_at = now;
        }
        changed
    }
}

fn replace(slot: &mut Option<String>, value: &str) -> bool {
    if slot.as_deref() == Some(value) {
        return false;
    }
    *slot = Some(value.to_string());
    true
}

fn fill(slot: &mut Option<String>, value: &str) -> bool {
    let empty = slot.as_deref().is_none_or(str::is_empty);
    if !empty || value.is_empty() {
        return false;
    }
    *slot = Some(value.to_string());
    true
}

impl fmt::Display for UpsertPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UpsertPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "insert-only" => Ok(Self::InsertOnly),
            "replace-on-conflict" | "replace" => Ok(Self::ReplaceOnConflict),
            "merge-fields" | "merge" => Ok(Self::MergeFields),
            other => Err(format!(
                "unknown upsert policy \"{other}\" \
                 (expected insert-only, replace-on-conflict or merge-fields)"
            )),
        }
    }
}

/// Entity totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RepositoryCounts {
    pub ontologies: usize,
    pub terms: usize,
}

/// Persistence contract for ontologies and terms, keyed by uri.
pub trait Repository: Send + Sync {
    /// Create the ontology if absent; otherwise apply `policy` to the stored one.
    fn upsert_ontology(
        &self,
        draft: OntologyDraft,
        policy: UpsertPolicy,
    ) -> StoreResult<Upserted<Ontology>>;

    /// Create the term if absent; otherwise apply `policy` to the stored one.
    fn upsert_term(&self, draft: TermDraft, policy: UpsertPolicy) -> StoreResult<Upserted<Term>>;

    fn ontology(&self, uri: &str) -> StoreResult<Option<Ontology>>;

    fn term(&self, uri: &str) -> StoreResult<Option<Term>>;

    /// All ontologies, ordered by uri.
    fn ontologies(&self) -> StoreResult<Vec<Ontology>>;

    /// All terms, ordered by uri.
    fn terms(&self) -> StoreResult<Vec<Term>>;

    /// Uris of terms whose parent set is empty, ordered by uri.
    fn terms_without_parents(&self) -> StoreResult<Vec<String>>;

    /// Record `parents` on the term only if its parent set is still empty.
    ///
    /// Returns `false` when the term is missing, already has parents, or
    /// `parents` is empty.
    fn set_parents_if_empty(&self, uri: &str, parents: BTreeSet<String>) -> StoreResult<bool>;

    /// Remove an ontology. Terms referencing it keep existing with their
    /// `ontology` reset to `None`.
    fn remove_ontology(&self, uri: &str) -> StoreResult<bool>;

    /// Change the ranking inputs of a term. Returns the updated term.
    fn update_ranking(&self, uri: &str, patch: RankingPatch) -> StoreResult<Option<Term>>;

    fn counts(&self) -> StoreResult<RepositoryCounts>;
}

/// Open the durable store under `data_dir`, or a fresh in-memory one when
/// `data_dir` is `None`.
pub fn open_repository(data_dir: Option<&Path>) -> StoreResult<Box<dyn Repository>> {
    match data_dir {
        Some(dir) => Ok(Box::new(DurableRepository::open(dir)?)),
        None => {
            tracing::debug!("using in-memory repository");
            Ok(Box::new(MemRepository::new()))
        }
    }
}

pub(crate) fn require_key(kind: &'static str, uri: &str) -> StoreResult<()> {
    if uri.trim().is_empty() {
        return Err(StoreError::EmptyKey { kind });
    }
    Ok(())
}
