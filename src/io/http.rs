//! Blocking HTTP transport used by the fetcher.

use std::time::Duration;

use reqwest::blocking::Client;
use tracing::debug;

use crate::error::Result;

/// Query string as ordered name/value pairs.
pub type Query = Vec<(String, String)>;

/// Issues a GET request and returns the response body.
///
/// Implementations must turn connection failures, timeouts and non-2xx
/// statuses into errors.
pub trait Transport {
    fn get(&self, url: &str, query: &Query) -> Result<String>;
}

/// [`Transport`] backed by a blocking `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Builds a client with a per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str, query: &Query) -> Result<String> {
        let response = self.client.get(url).query(query).send()?;
        debug!(status = %response.status(), url, "response received");
        let body = response.error_for_status()?.text()?;
        Ok(body)
    }
}
