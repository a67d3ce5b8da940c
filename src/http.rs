//! Blocking HTTP GET for raw manifests.

use std::time::Duration;

use thiserror::Error;

pub trait HttpFetch {
    /// GET `url` and return the body; non-2xx responses are errors.
    fn get_text(&self, url: &str) -> Result<String, FetchError>;
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP client error: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
}

fn build_http_client() -> Result<reqwest::blocking::Client, reqwest::Error> {
    reqwest::blocking::Client::builder()
        .user_agent(concat!("mcp-installer/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(15))
        .timeout(Duration::from_secs(30))
        .build()
}

/// `reqwest` blocking client.
pub struct ReqwestFetcher {
    client: reqwest::blocking::Client,
}

impl ReqwestFetcher {
    pub fn new() -> Result<Self, FetchError> {
        Ok(Self {
            client: build_http_client().map_err(FetchError::Client)?,
        })
    }
}

impl HttpFetch for ReqwestFetcher {
    fn get_text(&self, url: &str) -> Result<String, FetchError> {
        let request_err = |source| FetchError::Request {
            url: url.to_string(),
            source,
        };
        let resp = self.client.get(url).send().map_err(request_err)?;
        if !resp.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: resp.status().as_u16(),
            });
        }
        resp.text().map_err(request_err)
    }
}
