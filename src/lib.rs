// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # ontology-search
//!
//! Ingests OWL/RDF ontology documents into a keyed entity store and serves a
//! ranked search over the extracted terms.
//!
//! ## Architecture
//!
//! - **Fetch** (`fetch`): blocking HTTP GET with timeout and body cap
//! - **Graph** (`graph`): documents parsed into an oxigraph in-memory graph
//! - **Extraction** (`extract`): `owl:Ontology` and `owl:Class` subjects → drafts
//! - **Storage** (`store`): idempotent upserts, in memory (DashMap) or durable (redb)
//! - **Hierarchy** (`hierarchy`): second pass recording `rdfs:subClassOf` edges
//! - **Search** (`search`): folded token matching, favorite/weight/label ordering
//! - **Pipeline** (`ingest`): the stages above with progress, reports and cancellation
//! - **Remote** (`remote`): hands ingestion to a running server that owns the store
//!
//! ## Library usage
//!
//! ```no_run
//! use std::sync::atomic::AtomicBool;
//! use ontology_search::fetch::HttpFetcher;
//! use ontology_search::ingest::{IngestConfig, ingest_url};
//! use ontology_search::search::{SearchQuery, search};
//! use ontology_search::store::MemRepository;
//!
//! let repo = MemRepository::new();
//! let report = ingest_url(
//!     &HttpFetcher::default(),
//!     "http://purl.obolibrary.org/obo/go.owl",
//!     &repo,
//!     &IngestConfig::default(),
//!     &AtomicBool::new(false),
//! )
//! .unwrap();
//! println!("{} terms created", report.terms_created);
//!
//! let query = SearchQuery::parse(Some("cell")).unwrap().with_limit(Some(10));
//! for hit in search(&repo, &query).unwrap() {
//!     println!("{} {}", hit.term.uri, hit.term.display_name());
//! }
//! ```

pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod graph;
pub mod hierarchy;
pub mod ingest;
pub mod model;
pub mod paths;
pub mod remote;
pub mod search;
pub mod store;
