//! Persistence tests for the durable repository.
//!
//! These tests verify that ingested ontologies, terms, resolved parents and
//! ranking changes survive a close + reopen cycle.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use ontology_search::graph::DocumentFormat;
use ontology_search::ingest::{IngestConfig, ingest_bytes};
use ontology_search::model::{RankingPatch, TermDraft};
use ontology_search::search::{SearchQuery, search};
use ontology_search::store::{DurableRepository, Repository, UpsertPolicy, open_repository};

const ZOO: &[u8] = include_bytes!("fixtures/zoo.owl");
const ZOO_URI: &str = "http://example.org/zoo";

fn ingest_zoo(repo: &dyn Repository) {
    ingest_bytes(
        ZOO,
        DocumentFormat::RDF_XML,
        ZOO_URI,
        repo,
        &IngestConfig::default(),
        &AtomicBool::new(false),
    )
    .unwrap();
}

#[test]
fn ingested_terms_survive_restart() {
    let dir = tempfile::TempDir::new().unwrap();

    // First session: ingest and mark a favorite.
    {
        let repo = DurableRepository::open(dir.path()).unwrap();
        ingest_zoo(&repo);
        repo.update_ranking(
            "http://example.org/zoo#Cat",
            RankingPatch {
                is_favorite: Some(true),
                weight: Some(2.5),
            },
        )
        .unwrap();
    }

    // Second session: reopen and verify.
    {
        let repo = DurableRepository::open(dir.path()).unwrap();
        let counts = repo.counts().unwrap();
        assert_eq!(counts.ontologies, 1);
        assert_eq!(counts.terms, 4);

        let dog = repo.term("http://example.org/zoo#Dog").unwrap().unwrap();
        assert!(dog.sub_class_of.contains("http://example.org/zoo#Animal"));
        assert_eq!(dog.ontology.as_deref(), Some(ZOO_URI));

        let cat = repo.term("http://example.org/zoo#Cat").unwrap().unwrap();
        assert!(cat.is_favorite);
        assert_eq!(cat.weight, 2.5);

        let query = SearchQuery::parse(Some("zoo")).unwrap();
        let hits = search(&repo, &query).unwrap();
        assert_eq!(hits[0].term.uri, "http://example.org/zoo#Cat");
    }
}

#[test]
fn reingest_after_restart_is_idempotent() {
    let dir = tempfile::TempDir::new().unwrap();
    {
        let repo = open_repository(Some(dir.path())).unwrap();
        ingest_zoo(repo.as_ref());
    }
    let repo = open_repository(Some(dir.path())).unwrap();
    let before = repo.terms().unwrap();
    ingest_zoo(repo.as_ref());
    assert_eq!(repo.terms().unwrap(), before);
}

#[test]
fn removal_persists_and_nulls_references() {
    let dir = tempfile::TempDir::new().unwrap();
    {
        let repo = DurableRepository::open(dir.path()).unwrap();
        ingest_zoo(&repo);
        assert!(repo.remove_ontology(ZOO_URI).unwrap());
    }
    let repo = DurableRepository::open(dir.path()).unwrap();
    assert!(repo.ontology(ZOO_URI).unwrap().is_none());
    assert_eq!(repo.counts().unwrap().terms, 4);
    assert!(repo.terms().unwrap().iter().all(|t| t.ontology.is_none()));
}

#[test]
fn concurrent_writers_create_each_uri_once() {
    let dir = tempfile::TempDir::new().unwrap();
    let repo = Arc::new(DurableRepository::open(dir.path()).unwrap());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let repo = Arc::clone(&repo);
            std::thread::spawn(move || {
                (0..20)
                    .filter(|i| {
                        repo.upsert_term(
                            TermDraft::new(format!("ex:T{i}")),
                            UpsertPolicy::InsertOnly,
                        )
                        .unwrap()
                        .created
                    })
                    .count()
            })
        })
        .collect();
    let created: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(created, 20);
    assert_eq!(repo.counts().unwrap().terms, 20);
}

#[test]
fn in_memory_store_starts_empty() {
    let repo = open_repository(None).unwrap();
    assert_eq!(repo.counts().unwrap().terms, 0);
    ingest_zoo(repo.as_ref());
    assert_eq!(repo.counts().unwrap().terms, 4);
}
