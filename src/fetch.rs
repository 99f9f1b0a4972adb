//! Document retrieval over HTTP, plus local file reads for offline ingestion.

use std::io::Read;
use std::path::Path;
use std::time::Duration;

use crate::error::FetchError;

/// Result type for fetch operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Raw bytes of a retrieved document.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedDocument {
    /// Where the bytes came from (URL or file path).
    pub url: String,
    /// Declared `Content-Type`, for diagnostics only.
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

/// Something that can turn a URL into document bytes.
pub trait Fetch: Send + Sync {
    fn fetch(&self, url: &str) -> FetchResult<FetchedDocument>;
}

/// Request bounds for [`HttpFetcher`].
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub timeout: Duration,
    pub max_body_bytes: u64,
    pub user_agent: String,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            max_body_bytes: 256 * 1024 * 1024,
            user_agent: format!("ontology-search/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Blocking HTTP GET with a timeout and a body size cap. No retries.
pub struct HttpFetcher {
    agent: ureq::Agent,
    max_body_bytes: u64,
}

impl HttpFetcher {
    pub fn new(options: FetchOptions) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(options.timeout)
            .user_agent(&options.user_agent)
            .build();
        Self {
            agent,
            max_body_bytes: options.max_body_bytes,
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(FetchOptions::default())
    }
}

impl std::fmt::Debug for HttpFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpFetcher")
            .field("max_body_bytes", &self.max_body_bytes)
            .finish_non_exhaustive()
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &str) -> FetchResult<FetchedDocument> {
        validate_url(url)?;
        tracing::info!(url, "fetching document");

        let response = self.agent.get(url).call().map_err(|e| match e {
            ureq::Error::Status(status, _) => FetchError::Status {
                url: url.into(),
                status,
            },
            ureq::Error::Transport(t) => FetchError::Transport {
                url: url.into(),
                message: t.to_string(),
            },
        })?;

        let content_type = Some(response.content_type().to_string());
        let body = read_capped(response.into_reader(), url, self.max_body_bytes)?;
        tracing::debug!(url, bytes = body.len(), content_type = ?content_type, "fetched");

        Ok(FetchedDocument {
            url: url.into(),
            content_type,
            body,
        })
    }
}

/// Read a local document from disk.
pub fn read_local(path: &Path) -> FetchResult<FetchedDocument> {
    let name = path.display().to_string();
    let body = std::fs::read(path).map_err(|source| FetchError::Io {
        url: name.clone(),
        source,
    })?;
    Ok(FetchedDocument {
        url: name,
        content_type: None,
        body,
    })
}

/// Only absolute http(s) URLs with a host are fetched.
pub fn validate_url(url: &str) -> FetchResult<()> {
    let lower = url.trim().to_ascii_lowercase();
    let rest = lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"))
        .ok_or_else(|| FetchError::InvalidUrl {
            url: url.into(),
            message: "scheme must be http or https".into(),
        })?;
    let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if host.is_empty() {
        return Err(FetchError::InvalidUrl {
            url: url.into(),
            message: "missing host".into(),
        });
    }
    Ok(())
}

fn read_capped(reader: impl Read, url: &str, limit: u64) -> FetchResult<Vec<u8>> {
    let mut body = Vec::new();
    reader
        .take(limit.saturating_add(1))
        .read_to_end(&mut body)
        .map_err(|source| FetchError::Io {
            url: url.into(),
            source,
        })?;
    if body.len() as u64 > limit {
        return Err(FetchError::TooLarge {
            url: url.into(),
            limit,
        });
    }
    Ok(body)
}
