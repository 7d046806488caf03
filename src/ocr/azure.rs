//! Azure Document Intelligence provider.
//!
//! Analysis is asynchronous on the service side: the submit call answers 202
//! with an `Operation-Location` header, which is then polled until the
//! operation reports `succeeded` or `failed`. Polling is bounded so a stuck
//! operation cannot hold a request open forever.

use super::{AnalysisModel, AnalyzeResult, DocumentAnalyzer};
use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

const SERVICE: &str = "document analysis";
const API_VERSION: &str = "2024-11-30";
const POLL_INTERVAL: Duration = Duration::from_millis(500);
const MAX_POLLS: u32 = 120;

pub struct AzureDocIntelClient {
    client: reqwest::Client,
    endpoint: String,
    key: String,
}

impl AzureDocIntelClient {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            key: key.into(),
        }
    }

    async fn poll_operation(&self, operation_url: &str) -> Result<AnalyzeResult, Error> {
        for attempt in 0..MAX_POLLS {
            let resp = self
                .client
                .get(operation_url)
                .header("Ocp-Apim-Subscription-Key", &self.key)
                .send()
                .await
                .map_err(|e| Error::unavailable(SERVICE, e))?;

            if !resp.status().is_success() {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                return Err(Error::unavailable(
                    SERVICE,
                    format!("poll returned {}: {}", status, body),
                ));
            }

            let operation: OperationStatus = resp
                .json()
                .await
                .map_err(|e| Error::unexpected(SERVICE, e))?;

            match operation.status.as_str() {
                "succeeded" => {
                    debug!("Analysis succeeded after {} polls", attempt + 1);
                    return operation
                        .analyze_result
                        .ok_or_else(|| Error::unexpected(SERVICE, "succeeded without analyzeResult"));
                }
                "failed" => {
                    let detail = operation
                        .error
                        .map(|e| e.message)
                        .unwrap_or_else(|| "analysis failed".to_string());
                    return Err(Error::unavailable(SERVICE, detail));
                }
                // notStarted or running
                _ => tokio::time::sleep(POLL_INTERVAL).await,
            }
        }

        Err(Error::unavailable(SERVICE, "analysis did not complete in time"))
    }
}

#[async_trait::async_trait]
impl DocumentAnalyzer for AzureDocIntelClient {
    async fn analyze(
        &self,
        model: AnalysisModel,
        document_url: &str,
    ) -> Result<AnalyzeResult, Error> {
        let url = format!(
            "{}/documentintelligence/documentModels/{}:analyze?api-version={}",
            self.endpoint,
            model.model_id(),
            API_VERSION
        );

        info!("Submitting document for {} analysis", model.model_id());

        let resp = self
            .client
            .post(&url)
            .header("Ocp-Apim-Subscription-Key", &self.key)
            .json(&AnalyzeRequest {
                url_source: document_url.to_string(),
            })
            .send()
            .await
            .map_err(|e| Error::unavailable(SERVICE, e))?;

        // Grab the header before consuming the body.
        let operation_url = resp
            .headers()
            .get("Operation-Location")
            .and_then(|h| h.to_str().ok())
            .map(str::to_string);

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::unavailable(SERVICE, format!("{}: {}", status, body)));
        }

        let operation_url = operation_url
            .ok_or_else(|| Error::unexpected(SERVICE, "missing Operation-Location header"))?;

        self.poll_operation(&operation_url).await
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeRequest {
    url_source: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OperationStatus {
    status: String,
    #[serde(default)]
    analyze_result: Option<AnalyzeResult>,
    #[serde(default)]
    error: Option<OperationError>,
}

#[derive(Deserialize)]
struct OperationError {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyze_result_parsing() {
        let raw = r#"{
            "status": "succeeded",
            "analyzeResult": {
                "content": "PAY HDFC BANK",
                "keyValuePairs": [
                    {"key": {"content": "IFSC Code"}, "value": {"content": "HDFC0001234"}},
                    {"key": {"content": "orphan"}}
                ],
                "documents": [
                    {"fields": {"DocumentNumber": {"valueString": "ABCDE1234F"}}}
                ]
            }
        }"#;

        let operation: OperationStatus = serde_json::from_str(raw).unwrap();
        assert_eq!(operation.status, "succeeded");

        let result = operation.analyze_result.unwrap();
        assert_eq!(result.content, "PAY HDFC BANK");
        assert_eq!(result.key_value_pairs.len(), 2);
        assert_eq!(
            result.key_value_pairs[0].key.as_ref().unwrap().content,
            "IFSC Code"
        );
        assert!(result.key_value_pairs[1].value.is_none());
        assert_eq!(
            result.documents[0].fields["DocumentNumber"].value(),
            Some("ABCDE1234F")
        );
    }

    #[test]
    fn test_failed_operation_parsing() {
        let raw = r#"{"status": "failed", "error": {"code": "InvalidRequest", "message": "bad url"}}"#;
        let operation: OperationStatus = serde_json::from_str(raw).unwrap();
        assert_eq!(operation.status, "failed");
        assert_eq!(operation.error.unwrap().message, "bad url");
    }

    #[test]
    fn test_endpoint_trailing_slash_trimmed() {
        let client = AzureDocIntelClient::new(
            reqwest::Client::new(),
            "https://example.cognitiveservices.azure.com/",
            "key",
        );
        assert_eq!(client.endpoint, "https://example.cognitiveservices.azure.com");
    }
}
