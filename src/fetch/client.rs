// src/fetch/client.rs
// =============================================================================
// This module issues the HTTP GET requests for the mirror.
//
// Key functionality:
// - One shared reqwest Client (connection pooling across all tasks)
// - Follows redirects and remembers the FINAL url, because the trailing
//   slash of the final url is what tells a directory from a file
// - Never buffers a body: callers pull it chunk by chunk
// - Per-request timeout for the response head, and the same timeout for
//   every idle gap while reading the body
//
// Rust concepts:
// - async/await: For network I/O
// - Ownership: a FetchResult owns its response, so the body can only be
//   consumed once (text() takes self)
// =============================================================================

use std::time::Duration;

use anyhow::Result;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tokio::time::timeout;
use tracing::debug;
use url::Url;

use super::error::FetchError;

const MAX_REDIRECTS: usize = 10;

// Shared HTTP client for the whole run
//
// Cloning a Fetcher is cheap: reqwest::Client is reference counted inside.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    timeout: Duration,
}

impl Fetcher {
    // Builds the client
    //
    // Parameters:
    //   timeout: how long to wait for a response head, and for each body chunk
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("dir-mirror/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()?;

        Ok(Self { client, timeout })
    }

    // GETs an absolute url
    //
    // Returns as soon as the response head has arrived. Any non-2xx status
    // is an error; the caller never sees a FetchResult for a 404.
    pub async fn fetch(&self, url: &Url) -> Result<FetchResult, FetchError> {
        debug!(%url, "GET");

        let response = match timeout(self.timeout, self.client.get(url.clone()).send()).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Err(FetchError::from_reqwest(url, e)),
            Err(_) => {
                return Err(FetchError::Timeout {
                    url: url.to_string(),
                })
            }
        };

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: response.url().to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        Ok(FetchResult {
            final_url: response.url().clone(),
            content_type,
            status: status.as_u16(),
            response,
            idle_timeout: self.timeout,
        })
    }
}

// A successful response whose body has not been read yet
#[derive(Debug)]
pub struct FetchResult {
    final_url: Url,
    content_type: String,
    status: u16,
    response: reqwest::Response,
    idle_timeout: Duration,
}

impl FetchResult {
    /// The url after following redirects
    pub fn final_url(&self) -> &Url {
        &self.final_url
    }

    /// Raw Content-Type header, empty when the server sent none
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn is_directory(&self) -> bool {
        is_directory_url(&self.final_url)
    }

    pub fn is_html(&self) -> bool {
        self.content_type.to_ascii_lowercase().contains("text/html")
    }

    // Pulls the next piece of the body
    //
    // Returns Ok(None) once the body is exhausted. Chunk sizes are whatever
    // the connection delivers; re-chunking for disk happens in the sink.
    pub async fn chunk(&mut self) -> Result<Option<Bytes>, FetchError> {
        match timeout(self.idle_timeout, self.response.chunk()).await {
            Ok(Ok(chunk)) => Ok(chunk),
            Ok(Err(e)) => Err(FetchError::from_reqwest(&self.final_url, e)),
            Err(_) => Err(FetchError::Timeout {
                url: self.final_url.to_string(),
            }),
        }
    }

    // Reads the whole body as text (used for directory listings only)
    //
    // Invalid UTF-8 is replaced rather than rejected: the link pattern only
    // cares about ASCII markup.
    pub async fn text(mut self) -> Result<String, FetchError> {
        let mut body = Vec::new();
        while let Some(chunk) = self.chunk().await? {
            body.extend_from_slice(&chunk);
        }
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

// A url names a directory iff its path ends with a slash
pub fn is_directory_url(url: &Url) -> bool {
    url.path().ends_with('/')
}
