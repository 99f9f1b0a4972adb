//! Rich diagnostic error types for ontology-search.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains so users know exactly what
//! went wrong and how to fix it.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for ontology-search.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum OntologySearchError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Search(#[from] SearchError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Ingest(#[from] IngestError),
}

// ---------------------------------------------------------------------------
// Fetch errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum FetchError {
    #[error("invalid URL \"{url}\": {message}")]
    #[diagnostic(
        code(ontosearch::fetch::invalid_url),
        help("Only http:// and https:// URLs can be fetched. Use --file for local documents.")
    )]
    InvalidUrl { url: String, message: String },

    #[error("failed to fetch \"{url}\": {message}")]
    #[diagnostic(
        code(ontosearch::fetch::transport),
        help(
            "The request could not be completed. Check that the host is reachable, \
             the network is available, and consider raising `fetch.timeout_secs`."
        )
    )]
    Transport { url: String, message: String },

    #[error("failed to fetch \"{url}\": HTTP {status}")]
    #[diagnostic(
        code(ontosearch::fetch::status),
        help(
            "The server answered with a non-success status. \
             Verify the URL points at the ontology document."
        )
    )]
    Status { url: String, status: u16 },

    #[error("server at \"{url}\" rejected the request (HTTP {status}): {message}")]
    #[diagnostic(
        code(ontosearch::fetch::rejected),
        help("The ontology-search-server handled the request and reported this error.")
    )]
    Rejected {
        url: String,
        status: u16,
        message: String,
    },

    #[error("response from \"{url}\" exceeds {limit} bytes")]
    #[diagnostic(
        code(ontosearch::fetch::too_large),
        help(
            "Raise `fetch.max_body_bytes` in the configuration \
             if this document is expected to be this large."
        )
    )]
    TooLarge { url: String, limit: u64 },

    #[error("failed to read \"{url}\": {source}")]
    #[diagnostic(
        code(ontosearch::fetch::io),
        help(
            "Reading the document body failed. \
             Check the file path and permissions, or retry the download."
        )
    )]
    Io {
        url: String,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Parse errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ParseError {
    #[error("unsupported document format: \"{format}\"")]
    #[diagnostic(
        code(ontosearch::parse::unsupported_format),
        help(
            "Supported formats are application/rdf+xml (xml), text/turtle (turtle, ttl), \
             application/n-triples (nt), text/n3 (n3), application/n-quads (nquads) \
             and application/trig (trig)."
        )
    )]
    UnsupportedFormat { format: String },

    #[error("failed to parse \"{source_name}\" as {format}: {message}")]
    #[diagnostic(
        code(ontosearch::parse::syntax),
        help(
            "The document is not a valid {format} graph. \
             Check the declared --format matches the content."
        )
    )]
    Syntax {
        source_name: String,
        format: String,
        message: String,
    },
}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("uniqueness violation: {kind} \"{uri}\" already exists")]
    #[diagnostic(
        code(ontosearch::store::constraint),
        help("Another writer created this entity concurrently. The existing entity is kept.")
    )]
    Constraint { kind: &'static str, uri: String },

    #[error("cannot store {kind} with an empty uri")]
    #[diagnostic(
        code(ontosearch::store::empty_key),
        help("Every ontology and term is keyed by its uri, which must not be empty.")
    )]
    EmptyKey { kind: &'static str },

    #[error("redb transaction error: {message}")]
    #[diagnostic(
        code(ontosearch::store::redb),
        help(
            "The embedded database encountered a transaction error. \
             Try running with a fresh --data-dir. If the problem persists, file a bug report."
        )
    )]
    Redb { message: String },

    #[error("store at {path} is locked by another process")]
    #[diagnostic(
        code(ontosearch::store::locked),
        help(
            "Another ontology-search process (usually ontology-search-server) has the \
             store open. Pass `--server http://HOST:PORT` to ingest through it, or stop it."
        )
    )]
    Locked { path: String },

    #[error("serialization error: {message}")]
    #[diagnostic(
        code(ontosearch::store::serde),
        help(
            "Failed to encode or decode a stored record. The on-disk format may have \
             changed between versions; re-ingest into a fresh data directory."
        )
    )]
    Serialization { message: String },

    #[error("I/O error: {source}")]
    #[diagnostic(
        code(ontosearch::store::io),
        help(
            "Check that the data directory exists, is writable, \
             and that the disk is not full."
        )
    )]
    Io {
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Search errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum SearchError {
    #[error("Query parameter 'query' is required.")]
    #[diagnostic(
        code(ontosearch::search::missing_query),
        help("Pass a non-empty search string, e.g. `ontology-search search cell`.")
    )]
    MissingQuery,

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("cannot determine home directory")]
    #[diagnostic(
        code(ontosearch::config::no_home),
        help("Set the HOME environment variable or pass --data-dir explicitly.")
    )]
    NoHome,

    #[error("failed to create directory: {path}")]
    #[diagnostic(
        code(ontosearch::config::create_dir),
        help("Check that the parent directory exists and you have write permissions.")
    )]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(ontosearch::config::read),
        help("Ensure the config file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write config: {path}")]
    #[diagnostic(
        code(ontosearch::config::write),
        help("Check that the config directory is writable.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {message}")]
    #[diagnostic(
        code(ontosearch::config::parse),
        help("Check the TOML syntax and field names in the config file.")
    )]
    Parse { path: String, message: String },

    #[error("invalid config value for `{field}`: {message}")]
    #[diagnostic(code(ontosearch::config::invalid))]
    Invalid { field: &'static str, message: String },
}

// ---------------------------------------------------------------------------
// Ingestion errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum IngestError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error("ingestion of \"{source_name}\" cancelled during {stage}")]
    #[diagnostic(
        code(ontosearch::ingest::cancelled),
        help(
            "Entities upserted before cancellation remain stored. Re-run the ingestion \
             to complete it; existing entities are left untouched."
        )
    )]
    Cancelled {
        source_name: String,
        stage: &'static str,
    },
}

/// Convenience alias for results carrying the top-level error.
pub type Result<T> = std::result::Result<T, OntologySearchError>;
