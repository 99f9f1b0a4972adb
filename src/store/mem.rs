//! In-memory repository backed by DashMap.
//!
//! Useful for tests and one-shot runs (`--in-memory`). All data is lost on
//! process exit. Per-key atomicity comes from DashMap's shard locks.

use std::collections::BTreeSet;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::model::{Ontology, OntologyDraft, RankingPatch, Term, TermDraft, now_secs};
use crate::store::{
    Repository, RepositoryCounts, StoreResult, UpsertPolicy, Upserted, require_key,
};

/// Concurrent in-memory repository using sharded hashmaps.
#[derive(Debug, Default)]
pub struct MemRepository {
    ontologies: DashMap<String, Ontology>,
    terms: DashMap<String, Term>,
}

impl MemRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Repository for MemRepository {
    fn upsert_ontology(
        &self,
        draft: OntologyDraft,
        policy: UpsertPolicy,
    ) -> StoreResult<Upserted<Ontology>> {
        require_key("ontology", &draft.uri)?;
        let now = now_secs();
        match self.ontologies.entry(draft.uri.clone()) {
            Entry::Occupied(mut entry) => {
                policy.apply_ontology(entry.get_mut(), &draft, now);
                Ok(Upserted::existing(entry.get().clone()))
            }
            Entry::Vacant(entry) => {
                let ontology = draft.into_entity(now);
                entry.insert(ontology.clone());
                Ok(Upserted::created(ontology))
            }
        }
    }

    fn upsert_term(&self, draft: TermDraft, policy: UpsertPolicy) -> StoreResult<Upserted<Term>> {
        require_key("term", &draft.uri)?;
        let now = now_secs();
        match self.terms.entry(draft.uri.clone()) {
            Entry::Occupied(mut entry) => {
                policy.apply_term(entry.get_mut(), &draft, now);
                Ok(Upserted::existing(entry.get().clone()))
            }
            Entry::Vacant(entry) => {
                let term = draft.into_entity(now);
                entry.insert(term.clone());
                Ok(Upserted::created(term))
            }
        }
    }

    fn ontology(&self, uri: &str) -> StoreResult<Option<Ontology>> {
        Ok(self.ontologies.get(uri).map(|o| o.value().clone()))
    }

    fn term(&self, uri: &str) -> StoreResult<Option<Term>> {
        Ok(self.terms.get(uri).map(|t| t.value().clone()))
    }

    fn ontologies(&self) -> StoreResult<Vec<Ontology>> {
        let mut all: Vec<Ontology> = self.ontologies.iter().map(|e| e.value().clone()).collect();
        all.sort_by(|a, b| a.uri.cmp(&b.uri));
        Ok(all)
    }

    fn terms(&self) -> StoreResult<Vec<Term>> {
        let mut all: Vec<Term> = self.terms.iter().map(|e| e.value().clone()).collect();
        all.sort_by(|a, b| a.uri.cmp(&b.uri));
        Ok(all)
    }

    fn terms_without_parents(&self) -> StoreResult<Vec<String>> {
        let mut uris: Vec<String> = self
            .terms
            .iter()
            .filter(|e| e.value().sub_class_of.is_empty())
            .map(|e| e.key().clone())
            .collect();
        uris.sort();
        Ok(uris)
    }

    fn set_parents_if_empty(&self, uri: &str, parents: BTreeSet<String>) -> StoreResult<bool> {
        if parents.is_empty() {
            return Ok(false);
        }
        // The RefMut holds the shard write lock across check and set.
        let Some(mut term) = self.terms.get_mut(uri) else {
            return Ok(false);
        };
        if !term.sub_class_of.is_empty() {
            return Ok(false);
        }
        term.sub_class_of = parents;
        term.updated_at = now_secs();
        Ok(true)
    }

    fn remove_ontology(&self, uri: &str) -> StoreResult<bool> {
        if self.ontologies.remove(uri).is_none() {
            return Ok(false);
        }
        let now = now_secs();
        for mut term in self.terms.iter_mut() {
            if term.ontology.as_deref() == Some(uri) {
                term.ontology = None;
                term.updated_at = now;
            }
        }
        Ok(true)
    }

    fn update_ranking(&self, uri: &str, patch: RankingPatch) -> StoreResult<Option<Term>> {
        let Some(mut term) = self.terms.get_mut(uri) else {
            return Ok(None);
        };
        patch.apply(&mut term, now_secs());
        Ok(Some(term.clone()))
    }

    fn counts(&self) -> StoreResult<RepositoryCounts> {
        Ok(RepositoryCounts {
            ontologies: self.ontologies.len(),
            terms: self.terms.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn upsert_creates_then_returns_existing() {
        let repo = MemRepository::new();
        let first = repo
            .upsert_term(TermDraft::new("ex:Dog").with_label("Dog"), UpsertPolicy::InsertOnly)
            .unwrap();
        assert!(first.created);
        assert_eq!(first.entity.weight, 1.0);

        let second = repo
            .upsert_term(TermDraft::new("ex:Dog").with_label("Hound"), UpsertPolicy::InsertOnly)
            .unwrap();
        assert!(!second.created);
        assert_eq!(second.entity.label.as_deref(), Some("Dog"));
        assert_eq!(repo.counts().unwrap().terms, 1);
    }

    #[test]
    fn racing_upserts_create_once() {
        let repo = Arc::new(MemRepository::new());
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let repo = Arc::clone(&repo);
                std::thread::spawn(move || {
                    repo.upsert_term(
                        TermDraft::new("ex:Contended").with_label(format!("writer {i}")),
                        UpsertPolicy::InsertOnly,
                    )
                    .unwrap()
                    .created
                })
            })
            .collect();
        let created = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|c| *c)
            .count();
        assert_eq!(created, 1);
        assert_eq!(repo.counts().unwrap().terms, 1);
    }

    #[test]
    fn parents_are_set_once() {
        let repo = MemRepository::new();
        repo.upsert_term(TermDraft::new("ex:Dog"), UpsertPolicy::InsertOnly).unwrap();
        assert_eq!(repo.terms_without_parents().unwrap(), vec!["ex:Dog".to_string()]);

        let parents = BTreeSet::from(["ex:Animal".to_string()]);
        assert!(repo.set_parents_if_empty("ex:Dog", parents).unwrap());
        let again = BTreeSet::from(["ex:Pet".to_string()]);
        assert!(!repo.set_parents_if_empty("ex:Dog", again).unwrap());
        assert!(!repo.set_parents_if_empty("ex:Missing", BTreeSet::from(["x".into()])).unwrap());

        let dog = repo.term("ex:Dog").unwrap().unwrap();
        assert_eq!(dog.sub_class_of, BTreeSet::from(["ex:Animal".to_string()]));
        assert!(repo.terms_without_parents().unwrap().is_empty());
    }

    #[test]
    fn removing_ontology_nulls_term_reference() {
        let repo = MemRepository::new();
        repo.upsert_ontology(OntologyDraft::new("ex:onto", "Onto"), UpsertPolicy::InsertOnly)
            .unwrap();
        repo.upsert_term(
            TermDraft::new("ex:Dog").with_ontology("ex:onto"),
            UpsertPolicy::InsertOnly,
        )
        .unwrap();

        assert!(repo.remove_ontology("ex:onto").unwrap());
        assert!(!repo.remove_ontology("ex:onto").unwrap());
        let dog = repo.term("ex:Dog").unwrap().unwrap();
        assert_eq!(dog.ontology, None);
        assert_eq!(repo.counts().unwrap(), RepositoryCounts { ontologies: 0, terms: 1 });
    }

    #[test]
    fn ranking_patch_updates_term() {
        let repo = MemRepository::new();
        repo.upsert_term(TermDraft::new("ex:Dog"), UpsertPolicy::InsertOnly).unwrap();
        let updated = repo
            .update_ranking(
                "ex:Dog",
                RankingPatch {
                    weight: Some(4.0),
                    is_favorite: Some(true),
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(updated.weight, 4.0);
        assert!(updated.is_favorite);
        assert!(repo.update_ranking("ex:Nope", RankingPatch::default()).unwrap().is_none());
    }

    #[test]
    fn empty_uri_is_rejected() {
        let repo = MemRepository::new();
        let err = repo
            .upsert_ontology(OntologyDraft::new("", "nameless"), UpsertPolicy::InsertOnly)
            .unwrap_err();
        assert!(matches!(err, crate::error::StoreError::EmptyKey { .. }));
    }
}
