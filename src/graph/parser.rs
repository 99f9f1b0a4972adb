//! Document parsing: raw bytes of a declared media type → [`OntologyGraph`].
//!
//! Serialization formats are handled by `oxigraph::io`. Quads are folded into
//! a single graph; named-graph information is dropped.

use oxigraph::io::{RdfFormat, RdfParser};
use oxigraph::model::{NamedNode, Triple};

use crate::error::ParseError;
use crate::graph::OntologyGraph;

pub type ParseResult<T> = std::result::Result<T, ParseError>;

/// Media type assumed when none is declared.
pub const DEFAULT_MEDIA_TYPE: &str = "application/rdf+xml";

/// A resolved serialization format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentFormat(RdfFormat);

impl DocumentFormat {
    pub const RDF_XML: Self = Self(RdfFormat::RdfXml);
    pub const TURTLE: Self = Self(RdfFormat::Turtle);
    pub const N_TRIPLES: Self = Self(RdfFormat::NTriples);

    /// Resolve a media type (`text/turtle`) or short name (`ttl`, `xml`, `nt`).
    pub fn resolve(name: &str) -> ParseResult<Self> {
        let normalized = name.trim().to_ascii_lowercase();
        let by_name = match normalized.as_str() {
            "xml" | "rdf" | "owl" | "rdfxml" | "rdf/xml" | "pretty-xml" => {
                Some(RdfFormat::RdfXml)
            }
            "turtle" | "ttl" => Some(RdfFormat::Turtle),
            "nt" | "nt11" | "ntriples" | "n-triples" => Some(RdfFormat::NTriples),
            "n3" => Some(RdfFormat::N3),
            "nq" | "nquads" | "n-quads" => Some(RdfFormat::NQuads),
            "trig" => Some(RdfFormat::TriG),
            _ => None,
        };
        by_name
            .or_else(|| RdfFormat::from_media_type(&normalized))
            .map(Self)
            .ok_or_else(|| ParseError::UnsupportedFormat {
                format: name.to_string(),
            })
    }

    /// Guess a format from a file extension (`owl`, `ttl`, `nt`, ...).
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "owl" | "xml" => Some(Self::RDF_XML),
            ext => RdfFormat::from_extension(ext).map(Self),
        }
    }

    pub fn media_type(&self) -> &'static str {
        self.0.media_type()
    }

    pub fn name(&self) -> &'static str {
        self.0.name()
    }
}

impl Default for DocumentFormat {
    fn default() -> Self {
        Self::RDF_XML
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.media_type())
    }
}

/// Parse a whole document into a graph.
///
/// `source` names the document in errors and doubles as the base IRI for
/// relative references; it is not used as a base when it is not a valid
/// absolute IRI (e.g. a local file path).
pub fn parse_document(
    data: &[u8],
    format: DocumentFormat,
    source: &str,
) -> ParseResult<OntologyGraph> {
    let syntax = |message: String| ParseError::Syntax {
        source_name: source.to_string(),
        format: format.name().to_string(),
        message,
    };

    let mut parser = RdfParser::from_format(format.0);
    if NamedNode::new(source).is_ok() {
        parser = parser
            .with_base_iri(source)
            .map_err(|e| syntax(format!("invalid base IRI: {e}")))?;
    }

    let mut graph = OntologyGraph::new();
    for quad in parser.for_reader(data) {
        let quad = quad.map_err(|e| syntax(e.to_string()))?;
        graph.insert(&Triple::new(quad.subject, quad.predicate, quad.object));
    }

    tracing::debug!(
        source,
        format = format.name(),
        statements = graph.len(),
        "parsed document"
    );
    Ok(graph)
}
