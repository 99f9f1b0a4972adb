//! Ontology and term extraction from a parsed document.
//!
//! Extraction is literal: declared types and one title/label/definition per
//! subject, nothing inferred. Missing annotations become empty strings.

use crate::graph::OntologyGraph;
use crate::graph::vocab::{DCTERMS_TITLE, IAO_DEFINITION, OWL_CLASS, OWL_ONTOLOGY, RDFS_LABEL};
use crate::model::{OntologyDraft, TermDraft};

/// Extraction switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractOptions {
    /// Keep blank-node subjects (anonymous class expressions). Their
    /// identifiers are only stable within one parse.
    pub include_blank_nodes: bool,
}

/// One descriptor per subject typed `owl:Ontology`.
pub fn extract_ontologies(graph: &OntologyGraph, options: ExtractOptions) -> Vec<OntologyDraft> {
    graph
        .instances_of(OWL_ONTOLOGY)
        .into_iter()
        .filter(|subject| options.include_blank_nodes || !subject.is_blank())
        .map(|subject| {
            let uri = subject.as_str();
            OntologyDraft::new(uri, first_value(graph, uri, DCTERMS_TITLE))
        })
        .collect()
}

/// One descriptor per subject typed `owl:Class`, owned by `ontology`.
pub fn extract_terms(
    graph: &OntologyGraph,
    ontology: &OntologyDraft,
    options: ExtractOptions,
) -> Vec<TermDraft> {
    let terms: Vec<TermDraft> = graph
        .instances_of(OWL_CLASS)
        .into_iter()
        .filter(|subject| options.include_blank_nodes || !subject.is_blank())
        .map(|subject| {
            let uri = subject.as_str();
            TermDraft::new(uri)
                .with_ontology(ontology.uri.as_str())
                .with_label(first_value(graph, uri, RDFS_LABEL))
                .with_definition(first_value(graph, uri, IAO_DEFINITION))
        })
        .collect();

    tracing::debug!(ontology = %ontology.uri, terms = terms.len(), "extracted terms");
    terms
}

fn first_value(graph: &OntologyGraph, subject: &str, predicate: &str) -> String {
    graph
        .object(subject, predicate)
        .map(|node| node.as_str().to_string())
        .unwrap_or_default()
}
