//! End-to-end tests: document bytes → ingestion → search.

use std::sync::atomic::AtomicBool;

use ontology_search::error::{IngestError, OntologySearchError, ParseError, SearchError};
use ontology_search::fetch::{Fetch, FetchResult, FetchedDocument};
use ontology_search::graph::DocumentFormat;
use ontology_search::hierarchy::ancestors;
use ontology_search::ingest::{IngestConfig, ingest_bytes, ingest_file, ingest_url};
use ontology_search::model::RankingPatch;
use ontology_search::search::{SearchQuery, render, search};
use ontology_search::store::{MemRepository, Repository};

const ZOO: &[u8] = include_bytes!("fixtures/zoo.owl");
const ZOO_URI: &str = "http://example.org/zoo";

/// Serves canned bytes for any URL.
struct StaticFetcher(&'static [u8]);

impl Fetch for StaticFetcher {
    fn fetch(&self, url: &str) -> FetchResult<FetchedDocument> {
        Ok(FetchedDocument {
            url: url.into(),
            content_type: Some("application/rdf+xml".into()),
            body: self.0.to_vec(),
        })
    }
}

fn zoo_repo() -> MemRepository {
    let repo = MemRepository::new();
    ingest_url(
        &StaticFetcher(ZOO),
        ZOO_URI,
        &repo,
        &IngestConfig::default(),
        &AtomicBool::new(false),
    )
    .unwrap();
    repo
}

fn uris(repo: &MemRepository, query: &str) -> Vec<String> {
    let query = SearchQuery::parse(Some(query)).unwrap();
    search(repo, &query).unwrap()
        .into_iter()
        .map(|hit| hit.term.uri)
        .collect()
}

#[test]
fn ingesting_twice_keeps_counts() {
    let repo = zoo_repo();
    let first = repo.counts().unwrap();

    let report = ingest_url(
        &StaticFetcher(ZOO),
        ZOO_URI,
        &repo,
        &IngestConfig::default(),
        &AtomicBool::new(false),
    )
    .unwrap();
    assert_eq!(report.terms_created, 0);
    assert_eq!(repo.counts().unwrap(), first);
    assert_eq!(first.ontologies, 1);
    assert_eq!(first.terms, 4);
}

#[test]
fn dog_is_a_subclass_of_animal() {
    let repo = zoo_repo();
    let dog = repo.term("http://example.org/zoo#Dog").unwrap().unwrap();
    assert!(dog.sub_class_of.contains("http://example.org/zoo#Animal"));
    let animal = repo.term("http://example.org/zoo#Animal").unwrap().unwrap();
    assert!(animal.sub_class_of.is_empty());
}

#[test]
fn class_with_only_label_has_empty_definition() {
    let repo = zoo_repo();
    let thing = repo.term("http://example.org/zoo#Thing").unwrap().unwrap();
    assert_eq!(thing.label.as_deref(), Some("Thing"));
    assert_eq!(thing.definition.as_deref(), Some(""));
}

#[test]
fn lineage_reports_dangling_parents() {
    let repo = zoo_repo();
    let walk = ancestors(&repo, "http://example.org/zoo#Cat", 8).unwrap();
    let pet = walk
        .iter()
        .find(|a| a.uri == "http://example.org/zoo#Pet")
        .unwrap();
    assert!(!pet.known);
    let animal = walk
        .iter()
        .find(|a| a.uri == "http://example.org/zoo#Animal")
        .unwrap();
    assert!(animal.known);
    assert_eq!(animal.depth, 1);
}

#[test]
fn search_matches_label_definition_and_uri() {
    let repo = zoo_repo();
    assert_eq!(uris(&repo, "dog"), ["http://example.org/zoo#Dog"]);
    assert_eq!(uris(&repo, "carnivorous"), ["http://example.org/zoo#Dog"]);
    assert_eq!(uris(&repo, "zoo").len(), 4);
    assert!(uris(&repo, "platypus").is_empty());
}

#[test]
fn favorite_ranks_before_heavier_term() {
    let repo = zoo_repo();
    repo.update_ranking(
        "http://example.org/zoo#Cat",
        RankingPatch {
            is_favorite: Some(true),
            weight: Some(1.0),
        },
    )
    .unwrap();
    repo.update_ranking(
        "http://example.org/zoo#Dog",
        RankingPatch {
            weight: Some(10.0),
            ..Default::default()
        },
    )
    .unwrap();

    let ranked = uris(&repo, "zoo");
    assert_eq!(ranked[0], "http://example.org/zoo#Cat");
    assert_eq!(ranked[1], "http://example.org/zoo#Dog");
    // Remaining ties fall back to label order.
    assert_eq!(ranked[2], "http://example.org/zoo#Animal");
    assert_eq!(ranked[3], "http://example.org/zoo#Thing");
}

#[test]
fn empty_query_is_rejected() {
    assert!(matches!(SearchQuery::parse(Some("")), Err(SearchError::MissingQuery)));
    assert!(matches!(SearchQuery::parse(None), Err(SearchError::MissingQuery)));
}

#[test]
fn search_views_serialize_with_nested_ontology() {
    let repo = zoo_repo();
    let query = SearchQuery::parse(Some("dog")).unwrap();
    let views = render(&repo, search(&repo, &query).unwrap()).unwrap();
    let json = serde_json::to_value(&views).unwrap();
    assert_eq!(json[0]["uri"], "http://example.org/zoo#Dog");
    assert_eq!(json[0]["ontology"]["uri"], ZOO_URI);
    assert_eq!(json[0]["ontology"]["label"], "Zoo Ontology");
    assert_eq!(json[0]["subClassOf"][0], "http://example.org/zoo#Animal");
    assert_eq!(json[0]["weight"], 1.0);
    // Label hit, uri hit and exact label match.
    assert_eq!(json[0]["score"], 9.0);
}

#[test]
fn removed_ontology_leaves_terms_searchable() {
    let repo = zoo_repo();
    assert!(repo.remove_ontology(ZOO_URI).unwrap());
    let query = SearchQuery::parse(Some("dog")).unwrap();
    let views = render(&repo, search(&repo, &query).unwrap()).unwrap();
    assert_eq!(views.len(), 1);
    assert!(views[0].ontology.is_none());
}

#[test]
fn turtle_file_is_detected_by_extension() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("cells.ttl");
    std::fs::write(
        &path,
        r#"@prefix owl: <http://www.w3.org/2002/07/owl#> .
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
@prefix dcterms: <http://purl.org/dc/terms/> .
<http://example.org/cells> a owl:Ontology ; dcterms:title "Cells" .
<http://example.org/cells#Neuron> a owl:Class ;
    rdfs:label "neuron" ;
    rdfs:subClassOf <http://example.org/cells#Cell> .
"#,
    )
    .unwrap();

    let repo = MemRepository::new();
    let report = ingest_file(&path, &repo, &IngestConfig::default(), &AtomicBool::new(false))
        .unwrap();
    assert_eq!(report.terms_created, 1);
    assert_eq!(report.hierarchy.edges, 1);
    assert_eq!(uris(&repo, "neuron"), ["http://example.org/cells#Neuron"]);
}

#[test]
fn malformed_document_is_a_parse_error() {
    let repo = MemRepository::new();
    let err = ingest_bytes(
        b"this is not turtle <<<",
        DocumentFormat::TURTLE,
        "http://example.org/bad",
        &repo,
        &IngestConfig::default(),
        &AtomicBool::new(false),
    )
    .unwrap_err();
    assert!(matches!(
        &err,
        IngestError::Parse(ParseError::Syntax { source_name, .. })
            if source_name == "http://example.org/bad"
    ));
    assert!(err.to_string().contains("http://example.org/bad"));
    assert_eq!(repo.counts().unwrap().terms, 0);
}

#[test]
fn fetched_garbage_reports_the_url() {
    let repo = MemRepository::new();
    let err = ingest_url(
        &StaticFetcher(b"<html><body>Not Found</body>"),
        "http://example.org/moved.owl",
        &repo,
        &IngestConfig::default(),
        &AtomicBool::new(false),
    )
    .unwrap_err();
    let rendered = OntologySearchError::from(err).to_string();
    assert!(rendered.contains("http://example.org/moved.owl"), "{rendered}");
    assert_eq!(repo.counts().unwrap().ontologies, 0);
}

#[test]
fn unknown_format_name_is_rejected() {
    assert!(matches!(
        DocumentFormat::resolve("docx"),
        Err(ParseError::UnsupportedFormat { .. })
    ));
    assert_eq!(DocumentFormat::resolve("ttl").unwrap(), DocumentFormat::TURTLE);
    assert_eq!(
        DocumentFormat::resolve("application/rdf+xml").unwrap(),
        DocumentFormat::RDF_XML
    );
}
