//! Document-analysis provider abstraction.
//!
//! Defines the [`DocumentAnalyzer`] trait and unified result types so the
//! classifier and extractors can run against any backend (the Azure client in
//! production, canned responses in tests).

pub mod azure;

use crate::error::Error;
use serde::Deserialize;
use std::collections::HashMap;

/// Prebuilt analysis model selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalysisModel {
    /// Plain text recognition.
    Read,
    /// Generic key-value pair extraction.
    GenericDocument,
    /// Typed identity-document fields.
    IdentityDocument,
}

impl AnalysisModel {
    pub fn model_id(self) -> &'static str {
        match self {
            Self::Read => "prebuilt-read",
            Self::GenericDocument => "prebuilt-document",
            Self::IdentityDocument => "prebuilt-idDocument",
        }
    }
}

/// Unified analysis result. Which parts are populated depends on the model:
/// `content` for read, `key_value_pairs` for generic document, `documents`
/// for identity document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResult {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub key_value_pairs: Vec<KeyValuePair>,
    #[serde(default)]
    pub documents: Vec<AnalyzedDocument>,
}

/// A labeled field from generic document analysis. Either side may be absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeyValuePair {
    #[serde(default)]
    pub key: Option<KvElement>,
    #[serde(default)]
    pub value: Option<KvElement>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KvElement {
    pub content: String,
}

/// One recognized document with its typed fields (identity model).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyzedDocument {
    #[serde(default)]
    pub fields: HashMap<String, DocumentField>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentField {
    #[serde(default)]
    pub value_string: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

impl DocumentField {
    /// Field value, preferring the typed string over the raw content.
    pub fn value(&self) -> Option<&str> {
        self.value_string.as_deref().or(self.content.as_deref())
    }
}

/// Async trait implemented by each document-analysis backend.
#[async_trait::async_trait]
pub trait DocumentAnalyzer: Send + Sync {
    async fn analyze(
        &self,
        model: AnalysisModel,
        document_url: &str,
    ) -> Result<AnalyzeResult, Error>;
}
