//! Parsed ontology documents.
//!
//! [`OntologyGraph`] wraps an `oxigraph` in-memory [`Graph`]. Lookups take
//! plain identifier strings (IRIs, or `_:`-prefixed blank ids) and hand back
//! [`Node`] values, so extraction never touches oxigraph term types.

pub mod parser;
pub mod vocab;

use std::fmt;

use oxigraph::model::{
    BlankNodeRef, Graph, NamedNodeRef, NamedOrBlankNodeRef, TermRef, Triple, TripleRef,
};

pub use parser::{DocumentFormat, parse_document};

use vocab::RDF_TYPE;

/// Prefix distinguishing blank-node identifiers from IRIs.
pub const BLANK_PREFIX: &str = "_:";

/// A graph node: IRI, blank node, or literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Node {
    Iri(String),
    /// Blank node, stored with its `_:` prefix.
    Blank(String),
    Literal {
        value: String,
        language: Option<String>,
        datatype: Option<String>,
    },
}

impl Node {
    /// Identifier or lexical value: the IRI, the `_:`-prefixed blank id, or
    /// the literal's lexical form.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Iri(iri) => iri,
            Self::Blank(id) => id,
            Self::Literal { value, .. } => value,
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Self::Blank(_))
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Self::Literal { .. })
    }
}

impl From<TermRef<'_>> for Node {
    fn from(term: TermRef<'_>) -> Self {
        match term {
            TermRef::NamedNode(node) => Self::Iri(node.as_str().to_string()),
            TermRef::BlankNode(node) => {
                Self::Blank(format!("{BLANK_PREFIX}{}", node.as_str()))
            }
            TermRef::Literal(literal) => Self::Literal {
                value: literal.value().to_string(),
                language: literal.language().map(str::to_string),
                datatype: Some(literal.datatype().as_str().to_string()),
            },
            #[allow(unreachable_patterns)]
            other => Self::Literal {
                value: other.to_string(),
                language: None,
                datatype: None,
            },
        }
    }
}

impl From<NamedOrBlankNodeRef<'_>> for Node {
    fn from(subject: NamedOrBlankNodeRef<'_>) -> Self {
        match subject {
            NamedOrBlankNodeRef::NamedNode(node) => Self::Iri(node.as_str().to_string()),
            NamedOrBlankNodeRef::BlankNode(node) => {
                Self::Blank(format!("{BLANK_PREFIX}{}", node.as_str()))
            }
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Iri(iri) => write!(f, "<{iri}>"),
            Self::Blank(id) => f.write_str(id),
            Self::Literal {
                value,
                language: Some(lang),
                ..
            } => write!(f, "{value:?}@{lang}"),
            Self::Literal {
                value,
                datatype: Some(dt),
                ..
            } => write!(f, "{value:?}^^<{dt}>"),
            Self::Literal { value, .. } => write!(f, "{value:?}"),
        }
    }
}

/// A single (subject, predicate, object) fact, detached from the graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Statement {
    pub subject: Node,
    pub predicate: String,
    pub object: Node,
}

impl From<TripleRef<'_>> for Statement {
    fn from(triple: TripleRef<'_>) -> Self {
        Self {
            subject: triple.subject.into(),
            predicate: triple.predicate.as_str().to_string(),
            object: triple.object.into(),
        }
    }
}

/// One parsed document as a set of triples.
#[derive(Debug, Clone, Default)]
pub struct OntologyGraph {
    graph: Graph,
}

impl OntologyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a triple. Returns `false` if it was already present.
    pub fn insert<'a>(&mut self, triple: impl Into<TripleRef<'a>>) -> bool {
        self.graph.insert(triple)
    }

    pub fn len(&self) -> usize {
        self.graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    /// All statements matching the pattern. `None` in any position is a
    /// wildcard; subjects are matched by identifier.
    pub fn triples(
        &self,
        subject: Option<&str>,
        predicate: Option<&str>,
        object: Option<&Node>,
    ) -> Vec<Statement> {
        let subject = match subject.map(subject_ref) {
            Some(None) => return Vec::new(),
            resolved => resolved.flatten(),
        };
        let predicate = match predicate.map(named) {
            Some(None) => return Vec::new(),
            resolved => resolved.flatten(),
        };
        let keep = |triple: &TripleRef<'_>| {
            subject.is_none_or(|s| triple.subject == s)
                && predicate.is_none_or(|p| triple.predicate == p)
                && object.is_none_or(|o| Node::from(triple.object) == *o)
        };
        match (subject, predicate) {
            (Some(s), _) => self
                .graph
                .triples_for_subject(s)
                .filter(keep)
                .map(Statement::from)
                .collect(),
            (None, Some(p)) => self
                .graph
                .triples_for_predicate(p)
                .filter(keep)
                .map(Statement::from)
                .collect(),
            (None, None) => self.graph.iter().filter(keep).map(Statement::from).collect(),
        }
    }

    /// Distinct subjects declared `rdf:type` `class`, ordered by identifier.
    pub fn instances_of(&self, class: &str) -> Vec<Node> {
        let (Some(rdf_type), Some(class)) = (named(RDF_TYPE), named(class)) else {
            return Vec::new();
        };
        let mut subjects: Vec<Node> = self
            .graph
            .subjects_for_predicate_object(rdf_type, class)
            .map(Node::from)
            .collect();
        subjects.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        subjects
    }

    /// All objects of `subject` → `predicate`.
    ///
    /// An identifier that is not a valid IRI or blank id matches nothing.
    pub fn objects(&self, subject: &str, predicate: &str) -> Vec<Node> {
        let (Some(subject), Some(predicate)) = (subject_ref(subject), named(predicate)) else {
            return Vec::new();
        };
        self.graph
            .objects_for_subject_predicate(subject, predicate)
            .map(Node::from)
            .collect()
    }

    /// A single object of `subject` → `predicate`.
    ///
    /// When the document states several, the lexically smallest value wins,
    /// so the pick is the same on every parse of the same document.
    pub fn object(&self, subject: &str, predicate: &str) -> Option<Node> {
        self.objects(subject, predicate)
            .into_iter()
            .min_by(|a, b| a.as_str().cmp(b.as_str()))
    }
}

impl From<Graph> for OntologyGraph {
    fn from(graph: Graph) -> Self {
        Self { graph }
    }
}

impl FromIterator<Triple> for OntologyGraph {
    fn from_iter<I: IntoIterator<Item = Triple>>(iter: I) -> Self {
        Self {
            graph: iter.into_iter().collect(),
        }
    }
}

fn named(iri: &str) -> Option<NamedNodeRef<'_>> {
    NamedNodeRef::new(iri).ok()
}

fn subject_ref(id: &str) -> Option<NamedOrBlankNodeRef<'_>> {
    match id.strip_prefix(BLANK_PREFIX) {
        Some(blank) => BlankNodeRef::new(blank).ok().map(Into::into),
        None => named(id).map(Into::into),
    }
}
