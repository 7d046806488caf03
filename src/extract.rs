//! Category-dispatched field extraction via the completion model.
//!
//! Bank cheques go through read-model OCR and a text-only prompt; Aadhar, PAN
//! and ration cards embed the document image itself into a vision prompt. An
//! unknown document produces a fixed all-empty record without any service
//! calls.

use crate::classify::DocumentCategory;
use crate::completion::{CompletionProvider, CompletionRequest, Message};
use crate::error::Error;
use crate::fetch::DocumentFetcher;
use crate::ocr::{AnalysisModel, DocumentAnalyzer};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

const COMPLETION_MODEL: &str = "gpt-4o";

const IDENTITY_CARD_PROMPT: &str = "Please extract only Name, Aadhar number, Pan Number, \
     DateofBirth, Fathers Name and address in key-value pairs from the image. \
     Do not add any preamble before the extracted details.";

const RATION_CARD_PROMPT: &str = "Extract data from the image in key-value pairs for \
     New Ration Card No, FSC Reference No, Consumer No, Card Type, FPSHOP No. \
     and ration card member details. Do not add any preamble before the extracted data.";

const IDENTITY_CARD_MAX_TOKENS: u32 = 500;
const RATION_CARD_MAX_TOKENS: u32 = 300;

/// Result of an extraction: free-form completion text, or the fixed empty
/// record for documents that could not be classified.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ExtractionOutput {
    Text(String),
    Empty(EmptyDetails),
}

/// The all-empty record returned for unknown documents. Field names are part
/// of the API surface.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmptyDetails {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Aadhar Number")]
    pub aadhar_number: String,
    #[serde(rename = "Pan Number")]
    pub pan_number: String,
    #[serde(rename = "Fathers Name")]
    pub fathers_name: String,
    #[serde(rename = "DateOfBirth")]
    pub date_of_birth: String,
    #[serde(rename = "Ration_card_details")]
    pub ration_card_details: String,
    #[serde(rename = "Bank_Cheque_details")]
    pub bank_cheque_details: String,
}

#[derive(Clone)]
pub struct Extractor {
    analyzer: Arc<dyn DocumentAnalyzer>,
    completion: Arc<dyn CompletionProvider>,
    fetcher: Arc<dyn DocumentFetcher>,
}

impl Extractor {
    pub fn new(
        analyzer: Arc<dyn DocumentAnalyzer>,
        completion: Arc<dyn CompletionProvider>,
        fetcher: Arc<dyn DocumentFetcher>,
    ) -> Self {
        Self {
            analyzer,
            completion,
            fetcher,
        }
    }

    /// Run the extractor matching `category` against `document_url`.
    pub async fn extract(
        &self,
        category: DocumentCategory,
        document_url: &str,
    ) -> Result<ExtractionOutput, Error> {
        match category {
            DocumentCategory::BankCheque => self
                .extract_bank_cheque(document_url)
                .await
                .map(ExtractionOutput::Text),
            DocumentCategory::AadharCard | DocumentCategory::PanCard => self
                .extract_with_image(document_url, IDENTITY_CARD_PROMPT, IDENTITY_CARD_MAX_TOKENS)
                .await
                .map(ExtractionOutput::Text),
            DocumentCategory::RationCard => self
                .extract_with_image(document_url, RATION_CARD_PROMPT, RATION_CARD_MAX_TOKENS)
                .await
                .map(ExtractionOutput::Text),
            DocumentCategory::Unknown => Ok(ExtractionOutput::Empty(EmptyDetails::default())),
        }
    }

    /// Cheque path: read-model OCR text embedded into a field-listing prompt,
    /// sent as a text-only completion. Also serves the legacy
    /// `/process_document` endpoint directly.
    pub async fn extract_bank_cheque(&self, document_url: &str) -> Result<String, Error> {
        let read = self
            .analyzer
            .analyze(AnalysisModel::Read, document_url)
            .await?;

        let prompt = bank_cheque_prompt(&read.content);
        debug!("Bank cheque prompt ({} chars)", prompt.len());

        let response = self
            .completion
            .complete(CompletionRequest {
                model: COMPLETION_MODEL.to_string(),
                messages: vec![Message::user(prompt)],
                max_tokens: None,
            })
            .await?;

        info!("Bank cheque extraction returned {} chars", response.len());
        Ok(response)
    }

    /// Vision path: fetch the document bytes and send them base64-embedded
    /// alongside a fixed instruction.
    async fn extract_with_image(
        &self,
        document_url: &str,
        instruction: &str,
        max_tokens: u32,
    ) -> Result<String, Error> {
        let image = self.fetcher.fetch(document_url).await?;

        let response = self
            .completion
            .complete(CompletionRequest {
                model: COMPLETION_MODEL.to_string(),
                messages: vec![Message::user_with_image(instruction, &image)],
                max_tokens: Some(max_tokens),
            })
            .await?;

        info!("Vision extraction returned {} chars", response.len());
        Ok(response)
    }
}

fn bank_cheque_prompt(extracted_text: &str) -> String {
    format!(
        "You will be provided with the cheque details in triple quotes.\n\n\
         Extract the following details:\n\
         - Bank Name\n\
         - Branch Name\n\
         - IFSC Code / IFSCCode\n\
         - Account Number\n\n\
         Do not add any preamble before the extracted details.\n\n\
         '''{extracted_text}'''"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::AnalyzeResult;
    use std::sync::Mutex;

    struct FakeAnalyzer {
        content: String,
    }

    #[async_trait::async_trait]
    impl DocumentAnalyzer for FakeAnalyzer {
        async fn analyze(
            &self,
            _model: AnalysisModel,
            _document_url: &str,
        ) -> Result<AnalyzeResult, Error> {
            Ok(AnalyzeResult {
                content: self.content.clone(),
                ..Default::default()
            })
        }
    }

    /// Records the requests it receives and answers with a fixed string.
    struct FakeCompletion {
        reply: String,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl FakeCompletion {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl CompletionProvider for FakeCompletion {
        async fn complete(&self, request: CompletionRequest) -> Result<String, Error> {
            self.requests.lock().unwrap().push(request);
            Ok(self.reply.clone())
        }
    }

    struct FakeFetcher {
        bytes: Vec<u8>,
    }

    #[async_trait::async_trait]
    impl DocumentFetcher for FakeFetcher {
        async fn fetch(&self, _url: &str) -> Result<Vec<u8>, Error> {
            Ok(self.bytes.clone())
        }
    }

    fn extractor(
        analyzer: FakeAnalyzer,
        completion: Arc<FakeCompletion>,
        fetcher: FakeFetcher,
    ) -> Extractor {
        Extractor::new(Arc::new(analyzer), completion, Arc::new(fetcher))
    }

    #[tokio::test]
    async fn test_bank_cheque_returns_completion_text_unmodified() {
        let completion = Arc::new(FakeCompletion::new("Bank Name: HDFC\nIFSC Code: HDFC0001234"));
        let extractor = extractor(
            FakeAnalyzer {
                content: "PAY HDFC BANK A/C 0012345".to_string(),
            },
            completion.clone(),
            FakeFetcher { bytes: Vec::new() },
        );

        let output = extractor
            .extract(DocumentCategory::BankCheque, "http://example.com/cheque.jpg")
            .await
            .unwrap();

        assert_eq!(
            output,
            ExtractionOutput::Text("Bank Name: HDFC\nIFSC Code: HDFC0001234".to_string())
        );

        // OCR text must be embedded in the prompt, text-only, uncapped.
        let requests = completion.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].max_tokens.is_none());
        let body = serde_json::to_value(&requests[0]).unwrap();
        let prompt = body["messages"][0]["content"].as_str().unwrap();
        assert!(prompt.contains("PAY HDFC BANK A/C 0012345"));
        assert!(prompt.contains("Account Number"));
    }

    #[tokio::test]
    async fn test_identity_card_uses_vision_with_token_cap() {
        let completion = Arc::new(FakeCompletion::new("Name: R. Kumar"));
        let extractor = extractor(
            FakeAnalyzer {
                content: String::new(),
            },
            completion.clone(),
            FakeFetcher {
                bytes: vec![0xFF, 0xD8],
            },
        );

        let output = extractor
            .extract(DocumentCategory::AadharCard, "http://example.com/aadhar.jpg")
            .await
            .unwrap();
        assert_eq!(output, ExtractionOutput::Text("Name: R. Kumar".to_string()));

        let requests = completion.requests.lock().unwrap();
        assert_eq!(requests[0].max_tokens, Some(IDENTITY_CARD_MAX_TOKENS));
        let body = serde_json::to_value(&requests[0]).unwrap();
        let parts = body["messages"][0]["content"].as_array().unwrap();
        assert_eq!(parts[1]["type"], "image_url");
    }

    #[tokio::test]
    async fn test_ration_card_token_cap() {
        let completion = Arc::new(FakeCompletion::new("Card Type: AAY"));
        let extractor = extractor(
            FakeAnalyzer {
                content: String::new(),
            },
            completion.clone(),
            FakeFetcher {
                bytes: vec![0xFF, 0xD8],
            },
        );

        extractor
            .extract(DocumentCategory::RationCard, "http://example.com/ration.jpg")
            .await
            .unwrap();

        let requests = completion.requests.lock().unwrap();
        assert_eq!(requests[0].max_tokens, Some(RATION_CARD_MAX_TOKENS));
    }

    #[tokio::test]
    async fn test_unknown_returns_fixed_empty_record() {
        let completion = Arc::new(FakeCompletion::new("should not be called"));
        let extractor = extractor(
            FakeAnalyzer {
                content: String::new(),
            },
            completion.clone(),
            FakeFetcher { bytes: Vec::new() },
        );

        let output = extractor
            .extract(DocumentCategory::Unknown, "http://example.com/mystery.jpg")
            .await
            .unwrap();

        assert_eq!(output, ExtractionOutput::Empty(EmptyDetails::default()));
        assert!(completion.requests.lock().unwrap().is_empty());

        // Every key present, every value an empty string.
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "Name": "",
                "Aadhar Number": "",
                "Pan Number": "",
                "Fathers Name": "",
                "DateOfBirth": "",
                "Ration_card_details": "",
                "Bank_Cheque_details": ""
            })
        );
    }
}
