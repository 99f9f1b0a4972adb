//! Client for a running `ontology-search-server`.
//!
//! The durable store is a redb file that only one process can hold open.
//! While the server owns it, ingestion is handed to the server's
//! `POST /ingest` route instead of opening the store locally.

use serde::{Deserialize, Serialize};

use crate::error::FetchError;
use crate::fetch::{FetchOptions, FetchResult, validate_url};
use crate::ingest::IngestReport;
use crate::store::UpsertPolicy;

/// Body of `POST /ingest`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestRequest {
    /// Document to fetch.
    pub url: String,
    /// Media type or short format name; the server default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<UpsertPolicy>,
}

impl IngestRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            format: None,
            policy: None,
        }
    }
}

/// Error payload returned by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Blocking client for one server base URL (e.g. `http://127.0.0.1:8300`).
pub struct ServerClient {
    agent: ureq::Agent,
    base: String,
}

impl ServerClient {
    /// Only the connect phase is bounded; an ingestion runs as long as the
    /// server needs.
    pub fn new(base: &str, options: &FetchOptions) -> FetchResult<Self> {
        validate_url(base)?;
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(options.timeout)
            .user_agent(&options.user_agent)
            .build();
        Ok(Self {
            agent,
            base: base.trim_end_matches('/').to_string(),
        })
    }

    /// Ask the server to fetch and ingest `request.url`.
    pub fn ingest(&self, request: &IngestRequest) -> FetchResult<IngestReport> {
        let endpoint = format!("{}/ingest", self.base);
        tracing::info!(server = %self.base, url = %request.url, "delegating ingestion");

        let response = self
            .agent
            .post(&endpoint)
            .send_json(request)
            .map_err(|e| match e {
                ureq::Error::Status(status, response) => FetchError::Rejected {
                    message: response
                        .into_json::<ErrorBody>()
                        .map(|body| body.error)
                        .unwrap_or_else(|_| format!("HTTP {status}")),
                    url: endpoint.clone(),
                    status,
                },
                ureq::Error::Transport(t) => FetchError::Transport {
                    url: endpoint.clone(),
                    message: t.to_string(),
                },
            })?;

        response
            .into_json()
            .map_err(|source| FetchError::Io {
                url: endpoint,
                source,
            })
    }
}

impl std::fmt::Debug for ServerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerClient")
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::sync::mpsc;

    /// Answer one request with a canned JSON response and hand back the
    /// raw request text.
    fn serve_json(status: &str, body: &'static str) -> (String, mpsc::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let head = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\n\
             Content-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        );
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut seen = Vec::new();
            let mut buf = [0u8; 4096];
            // Headers, then the Content-Length bytes of the JSON body.
            loop {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                seen.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&seen);
                if let Some(split) = text.find("\r\n\r\n") {
                    let length = text[..split]
                        .lines()
                        .find_map(|l| {
                            l.to_ascii_lowercase()
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap())
                        })
                        .unwrap_or(0);
                    if seen.len() >= split + 4 + length {
                        break;
                    }
                }
            }
            stream.write_all(head.as_bytes()).unwrap();
            stream.write_all(body.as_bytes()).unwrap();
            tx.send(String::from_utf8_lossy(&seen).into_owned()).unwrap();
        });
        (format!("http://{addr}"), rx)
    }

    #[test]
    fn posts_request_and_reads_report() {
        let (base, request_text) = serve_json(
            "200 OK",
            r#"{"source":"http://example.org/zoo","statements":12,
                "ontologies_created":1,"ontologies_existing":0,
                "terms_created":4,"terms_existing":0,"skipped":0,
                "hierarchy":{"examined":4,"updated":2,"edges":3}}"#,
        );
        let client = ServerClient::new(&base, &FetchOptions::default()).unwrap();
        let report = client
            .ingest(&IngestRequest::new("http://example.org/zoo"))
            .unwrap();
        assert_eq!(report.terms_created, 4);
        assert_eq!(report.hierarchy.edges, 3);

        let sent = request_text.recv().unwrap();
        assert!(sent.starts_with("POST /ingest "), "{sent}");
        assert!(sent.contains(r#""url":"http://example.org/zoo""#), "{sent}");
        assert!(!sent.contains("policy"));
    }

    #[test]
    fn server_error_message_is_surfaced() {
        let (base, _) = serve_json(
            "422 Unprocessable Entity",
            r#"{"error":"failed to parse \"http://example.org/bad\" as RDF/XML: eof"}"#,
        );
        let client = ServerClient::new(&format!("{base}/"), &FetchOptions::default()).unwrap();
        let err = client
            .ingest(&IngestRequest::new("http://example.org/bad"))
            .unwrap_err();
        match err {
            FetchError::Rejected {
                status, message, ..
            } => {
                assert_eq!(status, 422);
                assert!(message.contains("http://example.org/bad"));
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn server_address_must_be_http() {
        let err = ServerClient::new("localhost:8300", &FetchOptions::default()).unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl { .. }));
    }
}
