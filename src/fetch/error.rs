// src/fetch/error.rs
// =============================================================================
// Error type for everything that can go wrong while fetching a URL.
//
// The fetcher never decides what a failure means for the whole run. It only
// sorts the failure into one of these variants and hands it back; the caller
// (the orchestrator for the root URL, the traversal engine for everything
// else) picks the policy.
// =============================================================================

use std::error::Error as _;

use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum FetchError {
    /// The server answered, but not with a 2xx status
    #[error("HTTP {status} fetching {url}")]
    Status { url: String, status: u16 },

    /// No response head (or no body chunk) within the configured timeout
    #[error("timed out fetching {url}")]
    Timeout { url: String },

    /// Could not resolve hostname
    #[error("could not resolve host for {url}")]
    Dns { url: String },

    /// TCP/TLS connection could not be established
    #[error("connection failed for {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Redirect loop or redirect chain longer than the client allows
    #[error("too many redirects fetching {url}")]
    TooManyRedirects { url: String },

    /// Anything else reqwest reports (body decoding, protocol errors, ...)
    #[error("request failed for {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    // Sorts a reqwest error into one of our variants.
    //
    // reqwest has no dedicated "DNS failed" flag, so this looks for "dns"
    // in the error text. The whole source chain is searched because the
    // top-level message only says "error sending request".
    pub fn from_reqwest(url: &Url, error: reqwest::Error) -> Self {
        let url = url.to_string();

        if error.is_timeout() {
            FetchError::Timeout { url }
        } else if error.is_redirect() {
            FetchError::TooManyRedirects { url }
        } else if error.is_connect() {
            if error_chain_text(&error).contains("dns") {
                FetchError::Dns { url }
            } else {
                FetchError::Connect { url, source: error }
            }
        } else {
            FetchError::Request { url, source: error }
        }
    }

    /// HTTP status code, when the failure was a non-2xx answer
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

fn error_chain_text(error: &reqwest::Error) -> String {
    let mut text = error.to_string().to_lowercase();
    let mut source = error.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string().to_lowercase());
        source = cause.source();
    }
    text
}
