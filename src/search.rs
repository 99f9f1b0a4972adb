//! Ranked term search.
//!
//! Text is folded before matching: NFKD decomposition, combining marks
//! dropped, lower-cased, then split into alphanumeric tokens. A term matches
//! when every query token occurs somewhere in its uri, label or definition.
//! Results are ordered by favorite flag, then weight (both descending), then
//! label and uri ascending.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::Serialize;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::error::SearchError;
use crate::model::{Ontology, Term};
use crate::store::Repository;

/// Result type for search operations.
pub type SearchResult<T> = std::result::Result<T, SearchError>;

const LABEL_HIT: f64 = 3.0;
const FIELD_HIT: f64 = 1.0;
const EXACT_LABEL_BONUS: f64 = 5.0;

/// Fold text for comparison: compatibility-decompose, strip accents, lowercase.
pub fn fold(text: &str) -> String {
    text.nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Split folded text into alphanumeric tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    fold(text)
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

/// A validated search request.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    raw: String,
    tokens: Vec<String>,
    limit: Option<usize>,
}

impl SearchQuery {
    /// Validate a caller-supplied query. Absent or blank input is rejected.
    pub fn parse(query: Option<&str>) -> SearchResult<Self> {
        let raw = query.map(str::trim).unwrap_or_default();
        if raw.is_empty() {
            return Err(SearchError::MissingQuery);
        }
        let mut tokens = tokenize(raw);
        if tokens.is_empty() {
            // Punctuation-only queries match literally.
            tokens.push(fold(raw));
        }
        Ok(Self {
            raw: raw.to_string(),
            tokens,
            limit: None,
        })
    }

    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }
}

/// A matched term with its relevance score.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub term: Term,
    /// Reported with the result; ordering does not use it.
    pub score: f64,
}

/// Matches and orders terms against a query.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchRanker;

impl SearchRanker {
    /// Relevance of `term` for `query`, or `None` when some token is missing.
    pub fn score(query: &SearchQuery, term: &Term) -> Option<f64> {
        let uri = fold(&term.uri);
        let label = fold(term.label.as_deref().unwrap_or_default());
        let definition = fold(term.definition.as_deref().unwrap_or_default());

        let mut score = 0.0;
        for token in query.tokens() {
            let in_label = label.contains(token.as_str());
            let in_uri = uri.contains(token.as_str());
            let in_definition = definition.contains(token.as_str());
            if !(in_label || in_uri || in_definition) {
                return None;
            }
            if in_label {
                score += LABEL_HIT;
            }
            if in_uri {
                score += FIELD_HIT;
            }
            if in_definition {
                score += FIELD_HIT;
            }
        }
        if !label.is_empty() && label == fold(query.as_str()) {
            score += EXACT_LABEL_BONUS;
        }
        Some(score)
    }

    /// Filter `terms` down to matches and order them.
    pub fn rank(query: &SearchQuery, terms: impl IntoIterator<Item = Term>) -> Vec<SearchHit> {
        let mut hits: Vec<SearchHit> = terms
            .into_iter()
            .filter_map(|term| Self::score(query, &term).map(|score| SearchHit { term, score }))
            .collect();
        hits.sort_by(|a, b| rank_order(&a.term, &b.term));
        if let Some(limit) = query.limit() {
            hits.truncate(limit);
        }
        hits
    }
}

/// Favorite first, heavier first, then label and uri ascending.
pub fn rank_order(a: &Term, b: &Term) -> Ordering {
    b.is_favorite
        .cmp(&a.is_favorite)
        .then_with(|| b.weight.total_cmp(&a.weight))
        .then_with(|| {
            let la = a.label.as_deref().unwrap_or_default();
            let lb = b.label.as_deref().unwrap_or_default();
            la.cmp(lb)
        })
        .then_with(|| a.uri.cmp(&b.uri))
}

/// Scan the repository and rank every term against `query`.
pub fn search(repo: &dyn Repository, query: &SearchQuery) -> SearchResult<Vec<SearchHit>> {
    let terms = repo.terms()?;
    let scanned = terms.len();
    let hits = SearchRanker::rank(query, terms);
    tracing::debug!(query = query.as_str(), scanned, hits = hits.len(), "search");
    Ok(hits)
}

// ── Response views ──

/// Ontology summary embedded in a search result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OntologySummary {
    pub uri: String,
    pub label: Option<String>,
}

impl From<&Ontology> for OntologySummary {
    fn from(ontology: &Ontology) -> Self {
        Self {
            uri: ontology.uri.clone(),
            label: ontology.label.clone(),
        }
    }
}

/// A search result as returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TermView {
    pub uri: String,
    pub label: Option<String>,
    pub definition: Option<String>,
    /// `None` when the term has no ontology or the ontology no longer exists.
    pub ontology: Option<OntologySummary>,
    #[serde(rename = "subClassOf")]
    pub sub_class_of: Vec<String>,
    pub weight: f64,
    pub is_favorite: bool,
    /// Relevance of the match (label hits weigh most). Not an ordering key.
    pub score: f64,
}

/// Attach ontology summaries to `hits`, looking each ontology up once.
pub fn render(repo: &dyn Repository, hits: Vec<SearchHit>) -> SearchResult<Vec<TermView>> {
    let mut summaries: HashMap<String, Option<OntologySummary>> = HashMap::new();
    let mut views = Vec::with_capacity(hits.len());
    for SearchHit { term, score } in hits {
        let ontology = match term.ontology.as_deref() {
            Some(uri) => match summaries.get(uri) {
                Some(cached) => cached.clone(),
                None => {
                    let summary = repo.ontology(uri)?.as_ref().map(OntologySummary::from);
                    summaries.insert(uri.to_string(), summary.clone());
                    summary
                }
            },
            None => None,
        };
        views.push(TermView {
            uri: term.uri,
            label: term.label,
            definition: term.definition,
            ontology,
            sub_class_of: term.sub_class_of.into_iter().collect(),
            weight: term.weight,
            is_favorite: term.is_favorite,
            score,
        });
    }
    Ok(views)
}
