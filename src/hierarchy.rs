//! Subclass resolution: the second ingestion pass.
//!
//! A term's parents may not exist yet when the term itself is upserted, so
//! parents are recorded only after every upsert has committed. Edges are raw
//! uri strings; nothing checks that the parent exists.

use std::collections::{BTreeSet, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::graph::OntologyGraph;
use crate::graph::vocab::RDFS_SUBCLASS_OF;
use crate::store::{Repository, StoreResult};

/// Outcome of one resolver run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveReport {
    /// Terms whose parent set was empty when the run started.
    pub examined: usize,
    /// Terms that received parents.
    pub updated: usize,
    /// Parent edges recorded.
    pub edges: usize,
}

/// Records `rdfs:subClassOf` objects on terms that have no parents yet.
#[derive(Debug, Clone, Copy)]
pub struct HierarchyResolver {
    include_blank_nodes: bool,
    progress_every: usize,
}

impl Default for HierarchyResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl HierarchyResolver {
    pub fn new() -> Self {
        Self {
            include_blank_nodes: false,
            progress_every: 100,
        }
    }

    /// Also record anonymous (blank-node) parents such as OWL restrictions.
    pub fn include_blank_nodes(mut self, include: bool) -> Self {
        self.include_blank_nodes = include;
        self
    }

    /// Log progress every `n` examined terms (0 disables).
    pub fn progress_every(mut self, n: usize) -> Self {
        self.progress_every = n;
        self
    }

    /// Parent uris of `uri` declared in `graph`.
    pub fn parents_in(&self, graph: &OntologyGraph, uri: &str) -> BTreeSet<String> {
        graph
            .objects(uri, RDFS_SUBCLASS_OF)
            .into_iter()
            .filter(|node| self.include_blank_nodes || !node.is_blank())
            .map(|node| node.as_str().to_string())
            .collect()
    }

    /// Resolve parents for every parentless term in the repository.
    ///
    /// Terms that already have parents are never revisited, so running twice
    /// against an unchanged store is a no-op after the first run.
    pub fn resolve(
        &self,
        graph: &OntologyGraph,
        repo: &dyn Repository,
    ) -> StoreResult<ResolveReport> {
        let mut report = ResolveReport::default();
        for uri in repo.terms_without_parents()? {
            report.examined += 1;
            let parents = self.parents_in(graph, &uri);
            let edge_count = parents.len();
            if !parents.is_empty() && repo.set_parents_if_empty(&uri, parents)? {
                report.updated += 1;
                report.edges += edge_count;
            }
            if self.progress_every > 0 && report.examined % self.progress_every == 0 {
                tracing::info!(examined = report.examined, "resolving subclasses");
            }
        }
        tracing::info!(
            examined = report.examined,
            updated = report.updated,
            edges = report.edges,
            "assigned subclasses"
        );
        Ok(report)
    }
}

/// One step of an ancestor walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ancestor {
    pub uri: String,
    /// Distance from the starting term (1 = direct parent).
    pub depth: usize,
    /// Whether the uri resolves to a stored term.
    pub known: bool,
}

/// Breadth-first walk up the subClassOf edges of `uri`.
///
/// Parents are looked up lazily by uri. Dangling parents are reported with
/// `known = false` and not expanded; cycles are cut by a visited set.
pub fn ancestors(
    repo: &dyn Repository,
    uri: &str,
    max_depth: usize,
) -> StoreResult<Vec<Ancestor>> {
    let mut visited = HashSet::from([uri.to_string()]);
    let mut queue = VecDeque::new();
    let mut out = Vec::new();

    if let Some(term) = repo.term(uri)? {
        queue.extend(term.sub_class_of.into_iter().map(|p| (p, 1)));
    }

    while let Some((parent, depth)) = queue.pop_front() {
        if depth > max_depth || !visited.insert(parent.clone()) {
            continue;
        }
        let stored = repo.term(&parent)?;
        out.push(Ancestor {
            uri: parent,
            depth,
            known: stored.is_some(),
        });
        if let Some(term) = stored {
            queue.extend(term.sub_class_of.into_iter().map(|p| (p, depth + 1)));
        }
    }
    Ok(out)
}
