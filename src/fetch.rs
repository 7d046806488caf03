//! Raw document byte fetching for image embedding.

use crate::error::Error;
use tracing::debug;

const SERVICE: &str = "document fetch";

/// Async trait for retrieving the raw bytes behind a document URL.
#[async_trait::async_trait]
pub trait DocumentFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, Error>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl DocumentFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, Error> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::unavailable(SERVICE, e))?;

        if !resp.status().is_success() {
            return Err(Error::unavailable(
                SERVICE,
                format!("{} fetching {}", resp.status(), url),
            ));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| Error::unavailable(SERVICE, e))?;

        debug!("Fetched {} bytes from {}", bytes.len(), url);
        Ok(bytes.to_vec())
    }
}
