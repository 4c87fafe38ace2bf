//! HTTP fetch capability used by the font and emoji resolvers.

use crate::Result;
use std::collections::HashMap;
use std::sync::Mutex;

#[cfg(feature = "http")]
use crate::Error;
#[cfg(feature = "http")]
use reqwest::blocking::Client;
#[cfg(feature = "http")]
use std::time::Duration;

/// A fetched response: status code plus the full body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl FetchResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// 2xx status
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Performs GET requests.
///
/// A non-2xx status is a normal `Ok` response; `Err` is reserved for
/// transport failures (DNS, connection, timeouts).
pub trait Fetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<FetchResponse>;
}

/// Blocking `reqwest` fetcher.
#[cfg(feature = "http")]
pub struct HttpFetcher {
    client: Client,
}

#[cfg(feature = "http")]
impl HttpFetcher {
    /// Build a client with the given user agent and timeout.
    ///
    /// The user agent matters: the font directory serves WOFF2 to browser
    /// user agents, and only opentype/truetype sources are usable.
    pub fn new(user_agent: &str, timeout_ms: u64) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| {
                Error::InitializationError(format!("Failed to build HTTP client: {}", e))
            })?;
        Ok(Self { client })
    }
}

#[cfg(feature = "http")]
impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<FetchResponse> {
        log::debug!("GET {}", url);
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| Error::NetworkError(format!("Failed to fetch {}: {}", url, e)))?;
        let status = resp.status().as_u16();
        let body = resp
            .bytes()
            .map_err(|e| Error::NetworkError(format!("Failed to read body of {}: {}", url, e)))?;
        Ok(FetchResponse::new(status, body.to_vec()))
    }
}

/// Fetcher answering from a fixed URL table, recording every request.
///
/// Unknown URLs answer 404. Useful for tests and fully offline rendering.
#[derive(Debug, Default)]
pub struct StaticFetcher {
    routes: HashMap<String, FetchResponse>,
    requests: Mutex<Vec<String>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `url` with `status` and `body`.
    pub fn route(mut self, url: impl Into<String>, status: u16, body: impl Into<Vec<u8>>) -> Self {
        self.routes
            .insert(url.into(), FetchResponse::new(status, body));
        self
    }

    /// URLs requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }
}

impl Fetcher for StaticFetcher {
    fn fetch(&self, url: &str) -> Result<FetchResponse> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(url.to_string());
        }
        Ok(self
            .routes
            .get(url)
            .cloned()
            .unwrap_or_else(|| FetchResponse::new(404, b"Not Found".to_vec())))
    }
}
