//! Ontology ingestion pipeline.
//!
//! Orchestrates: fetch → parse → extract ontologies → upsert terms per
//! ontology → resolve subclasses. Upserts are not wrapped in one transaction;
//! whatever committed before a failure or cancellation stays stored.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{IngestError, StoreError};
use crate::extract::{ExtractOptions, extract_ontologies, extract_terms};
use crate::fetch::{Fetch, read_local};
use crate::graph::{DocumentFormat, OntologyGraph, parse_document};
use crate::hierarchy::{HierarchyResolver, ResolveReport};
use crate::model::{OntologyDraft, TermDraft};
use crate::store::{Repository, UpsertPolicy};

/// Result type for ingestion.
pub type IngestResult<T> = std::result::Result<T, IngestError>;

/// Shared cancellation flag. Setting it stops the run at the next check.
pub type CancelFlag = Arc<AtomicBool>;

pub fn cancel_flag() -> CancelFlag {
    Arc::new(AtomicBool::new(false))
}

/// Configuration for the ingestion pipeline.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Explicit document format. When unset, URLs use `default_format` and
    /// local files are guessed from their extension first.
    pub format: Option<DocumentFormat>,
    pub default_format: DocumentFormat,
    pub policy: UpsertPolicy,
    /// Upsert terms on the rayon pool.
    pub parallel: bool,
    /// Keep anonymous classes and restriction parents.
    pub include_blank_nodes: bool,
    /// Log progress every `n` terms (0 disables).
    pub progress_every: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            format: None,
            default_format: DocumentFormat::default(),
            policy: UpsertPolicy::default(),
            parallel: true,
            include_blank_nodes: false,
            progress_every: 100,
        }
    }
}

/// Summary of one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestReport {
    pub source: String,
    pub statements: usize,
    pub ontologies_created: usize,
    pub ontologies_existing: usize,
    pub terms_created: usize,
    pub terms_existing: usize,
    /// Upserts rejected by the store (duplicate or empty key).
    pub skipped: usize,
    pub hierarchy: ResolveReport,
}

enum Outcome {
    Created,
    Existing,
    Skipped,
}

/// Fetch `url` and ingest it.
pub fn ingest_url(
    fetcher: &dyn Fetch,
    url: &str,
    repo: &dyn Repository,
    config: &IngestConfig,
    cancel: &AtomicBool,
) -> IngestResult<IngestReport> {
    let document = fetcher.fetch(url)?;
    let format = config.format.unwrap_or(config.default_format);
    ingest_bytes(&document.body, format, url, repo, config, cancel)
}

/// Read a local document and ingest it.
pub fn ingest_file(
    path: &Path,
    repo: &dyn Repository,
    config: &IngestConfig,
    cancel: &AtomicBool,
) -> IngestResult<IngestReport> {
    let document = read_local(path)?;
    let format = config.format.unwrap_or_else(|| {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(DocumentFormat::from_extension)
            .unwrap_or(config.default_format)
    });
    ingest_bytes(&document.body, format, &document.url, repo, config, cancel)
}

/// Parse raw document bytes and ingest the resulting graph.
///
/// `source` names the document in logs and errors, and doubles as the base
/// IRI when it is an absolute IRI.
pub fn ingest_bytes(
    data: &[u8],
    format: DocumentFormat,
    source: &str,
    repo: &dyn Repository,
    config: &IngestConfig,
    cancel: &AtomicBool,
) -> IngestResult<IngestReport> {
    check_cancel(cancel, source, "parse")?;
    tracing::info!(source, format = format.name(), bytes = data.len(), "parsing ontology");
    let graph = parse_document(data, format, source)?;
    ingest_graph(&graph, source, repo, config, cancel)
}

/// Extract, upsert and resolve everything in an already parsed graph.
pub fn ingest_graph(
    graph: &OntologyGraph,
    source: &str,
    repo: &dyn Repository,
    config: &IngestConfig,
    cancel: &AtomicBool,
) -> IngestResult<IngestReport> {
    let options = ExtractOptions {
        include_blank_nodes: config.include_blank_nodes,
    };
    let mut report = IngestReport {
        source: source.to_string(),
        statements: graph.len(),
        ..Default::default()
    };

    // 1. Ontologies.
    let ontologies = extract_ontologies(graph, options);
    if ontologies.is_empty() {
        tracing::warn!(source, "document declares no owl:Ontology; no terms will be created");
    }

    // 2. Terms, per ontology.
    for draft in ontologies {
        check_cancel(cancel, source, "ontology upsert")?;
        let terms = extract_terms(graph, &draft, options);
        let Some(ontology) = upsert_ontology(repo, draft, config.policy, &mut report)? else {
            continue;
        };
        tracing::info!(ontology = %ontology, terms = terms.len(), "creating terms");

        let outcomes = upsert_terms(repo, terms, config, source, cancel)?;
        let mut created = 0;
        for outcome in outcomes {
            match outcome {
                Outcome::Created => created += 1,
                Outcome::Existing => report.terms_existing += 1,
                Outcome::Skipped => report.skipped += 1,
            }
        }
        report.terms_created += created;
        tracing::info!(ontology = %ontology, created, "created terms for ontology");
    }

    // 3. Subclasses, once every term has committed.
    check_cancel(cancel, source, "subclass resolution")?;
    report.hierarchy = HierarchyResolver::new()
        .include_blank_nodes(config.include_blank_nodes)
        .progress_every(config.progress_every)
        .resolve(graph, repo)?;

    tracing::info!(
        source,
        ontologies_created = report.ontologies_created,
        terms_created = report.terms_created,
        terms_existing = report.terms_existing,
        skipped = report.skipped,
        "ingestion complete"
    );
    Ok(report)
}

/// Returns the ontology uri, or `None` when the store rejected the draft.
fn upsert_ontology(
    repo: &dyn Repository,
    draft: OntologyDraft,
    policy: UpsertPolicy,
    report: &mut IngestReport,
) -> IngestResult<Option<String>> {
    let uri = draft.uri.clone();
    match repo.upsert_ontology(draft, policy) {
        Ok(upserted) => {
            let name = upserted.entity.display_name().to_string();
            if upserted.created {
                report.ontologies_created += 1;
                tracing::info!(uri = %uri, label = %name, "created ontology");
            } else {
                report.ontologies_existing += 1;
                tracing::info!(uri = %uri, label = %name, "ontology already exists");
            }
            Ok(Some(uri))
        }
        Err(e) if is_per_entity(&e) => {
            report.skipped += 1;
            tracing::warn!(uri = %uri, error = %e, "skipping ontology");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

fn upsert_terms(
    repo: &dyn Repository,
    terms: Vec<TermDraft>,
    config: &IngestConfig,
    source: &str,
    cancel: &AtomicBool,
) -> IngestResult<Vec<Outcome>> {
    let processed = AtomicUsize::new(0);
    let upsert = |draft: TermDraft| -> IngestResult<Outcome> {
        check_cancel(cancel, source, "term upsert")?;
        let uri = draft.uri.clone();
        let outcome = match repo.upsert_term(draft, config.policy) {
            Ok(upserted) if upserted.created => Outcome::Created,
            Ok(_) => Outcome::Existing,
            Err(e) if is_per_entity(&e) => {
                tracing::warn!(uri = %uri, error = %e, "skipping term");
                Outcome::Skipped
            }
            Err(e) => return Err(e.into()),
        };
        let done = processed.fetch_add(1, Ordering::Relaxed) + 1;
        if config.progress_every > 0 && done % config.progress_every == 0 {
            tracing::info!(processed = done, "processed terms");
        }
        Ok(outcome)
    };

    if config.parallel {
        terms.into_par_iter().map(upsert).collect()
    } else {
        terms.into_iter().map(upsert).collect()
    }
}

/// Store errors that fail one upsert without aborting the run.
fn is_per_entity(error: &StoreError) -> bool {
    matches!(error, StoreError::Constraint { .. } | StoreError::EmptyKey { .. })
}

fn check_cancel(cancel: &AtomicBool, source: &str, stage: &'static str) -> IngestResult<()> {
    if cancel.load(Ordering::Relaxed) {
        tracing::warn!(source, stage, "ingestion cancelled");
        return Err(IngestError::Cancelled {
            source_name: source.to_string(),
            stage,
        });
    }
    Ok(())
}
