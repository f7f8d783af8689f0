//! Client side of the query endpoint, for peers that want the handles a
//! node exposes.

use std::time::Duration;

use invoker_core::{CodecError, Encoding, HandleRecord, ServiceQuery};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;

/// Failures of a remote query.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("query request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("query rejected with {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Queries the invoker endpoint of one remote node.
#[derive(Debug, Clone)]
pub struct QueryClient {
    http: reqwest::Client,
    endpoint: String,
    encoding: Encoding,
}

impl QueryClient {
    /// Creates a client for the node at `base_url` (e.g. `http://10.0.0.5:8080`)
    /// whose endpoint is mounted under `invoker_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &str, invoker_path: &str) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            http,
            endpoint: format!(
                "{}/{}/query",
                base_url.trim_end_matches('/'),
                invoker_path.trim_matches('/')
            ),
            encoding: Encoding::Json,
        })
    }

    /// Uses `encoding` for request and response bodies.
    #[must_use]
    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Asks the node for its handles answering `query`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Status`] when the node refuses the query, or a
    /// transport or codec error.
    pub async fn query(&self, query: &ServiceQuery) -> Result<Vec<HandleRecord>, ClientError> {
        let content_type = self.encoding.content_type();
        let response = self
            .http
            .post(&self.endpoint)
            .header(CONTENT_TYPE, content_type)
            .header(ACCEPT, content_type)
            .body(self.encoding.encode(query)?)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status { status, body });
        }

        let bytes = response.bytes().await?;
        Ok(self.encoding.decode(&bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_base_and_path() {
        let client = QueryClient::new("http://10.0.0.5:8080/", "/invoker/").unwrap();
        assert_eq!(client.endpoint(), "http://10.0.0.5:8080/invoker/query");
    }
}
