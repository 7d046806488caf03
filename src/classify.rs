//! Document-type classification over OCR key-value pairs and identity fields.
//!
//! The decision procedure runs up to three analysis passes: a generic
//! key-value scan for ration-card and bank-cheque labels, an identity pass
//! matching `DocumentNumber` shapes, and a last-resort generic pass looking
//! for the literal Aadhaar label. Classification is stateless; the same
//! analysis responses always yield the same category.

use crate::error::Error;
use crate::ocr::{AnalysisModel, DocumentAnalyzer, KeyValuePair};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Labels whose presence marks a document as a bank cheque.
const BANK_INDICATORS: &[&str] = &[
    "A/C No", "A/c No.", "A/C. No.", "A/c. No.", "Pay", "PAY", "BEARER", "Bearer", "account No",
    "IFSCCode", "IFSC Code", "IFS Code",
];

/// Exact key emitted by generic analysis on some Aadhar card layouts.
const AADHAR_LABEL: &str = "Your Aadhaar No. :";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentCategory {
    BankCheque,
    AadharCard,
    PanCard,
    RationCard,
    Unknown,
}

impl DocumentCategory {
    /// Wire label used in API responses.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BankCheque => "Bank Cheque",
            Self::AadharCard => "Aadhar card",
            Self::PanCard => "PAN card",
            Self::RationCard => "Ration Card",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for DocumentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone)]
pub struct Classifier {
    analyzer: Arc<dyn DocumentAnalyzer>,
}

impl Classifier {
    pub fn new(analyzer: Arc<dyn DocumentAnalyzer>) -> Self {
        Self { analyzer }
    }

    /// Classify the document behind `document_url` (already percent-decoded).
    ///
    /// Always terminates with a category; `Unknown` is a valid outcome, not
    /// an error. Analysis failures propagate unretried.
    pub async fn classify(&self, document_url: &str) -> Result<DocumentCategory, Error> {
        let generic = self
            .analyzer
            .analyze(AnalysisModel::GenericDocument, document_url)
            .await?;

        let scan = scan_key_value_pairs(&generic.key_value_pairs);
        if scan.bank_cheque {
            return Ok(DocumentCategory::BankCheque);
        }
        if scan.ration_card {
            return Ok(DocumentCategory::RationCard);
        }

        let identity = self
            .analyzer
            .analyze(AnalysisModel::IdentityDocument, document_url)
            .await?;

        for document in &identity.documents {
            let Some(number) = document.fields.get("DocumentNumber").and_then(|f| f.value())
            else {
                continue;
            };
            if let Some(category) = classify_document_number(number) {
                debug!("DocumentNumber shape matched {}", category);
                return Ok(category);
            }
        }

        // Some Aadhar layouts carry no usable DocumentNumber; fall back to
        // the printed label before giving up.
        let generic = self
            .analyzer
            .analyze(AnalysisModel::GenericDocument, document_url)
            .await?;

        let aadhar_label_found = generic.key_value_pairs.iter().any(|pair| {
            matches!(
                (&pair.key, &pair.value),
                (Some(key), Some(_)) if key.content == AADHAR_LABEL
            )
        });

        if aadhar_label_found {
            Ok(DocumentCategory::AadharCard)
        } else {
            info!("Document type is unknown");
            Ok(DocumentCategory::Unknown)
        }
    }
}

/// Outcome of one pass over generic-analysis key-value pairs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct KvScan {
    bank_cheque: bool,
    ration_card: bool,
}

/// Scan pairs in order, skipping any with a missing key or value.
///
/// Ration-card labels are recorded without stopping; the first bank indicator
/// ends the scan. A bank match therefore wins even when a ration label
/// appeared earlier in the sequence.
fn scan_key_value_pairs(pairs: &[KeyValuePair]) -> KvScan {
    let mut scan = KvScan::default();
    for pair in pairs {
        let (Some(key), Some(_value)) = (&pair.key, &pair.value) else {
            continue;
        };
        let key = key.content.as_str();
        if key.contains("New Ration Card No") {
            scan.ration_card = true;
        } else if key.contains("Old RationCard No") || key.contains("Old RCNo") {
            scan.ration_card = true;
        } else if BANK_INDICATORS.iter().any(|term| key.contains(term)) {
            scan.bank_cheque = true;
            break;
        }
    }
    scan
}

/// Classify an identity `DocumentNumber` by shape, ignoring internal spaces:
/// twelve digits is an Aadhar number, five letters + four digits + one letter
/// is a PAN number.
fn classify_document_number(raw: &str) -> Option<DocumentCategory> {
    let number: Vec<char> = raw.chars().filter(|c| *c != ' ').collect();

    if number.len() == 12 && number.iter().all(|c| c.is_ascii_digit()) {
        return Some(DocumentCategory::AadharCard);
    }

    if number.len() == 10
        && number[..5].iter().all(|c| c.is_ascii_alphabetic())
        && number[5..9].iter().all(|c| c.is_ascii_digit())
        && number[9].is_ascii_alphabetic()
    {
        return Some(DocumentCategory::PanCard);
    }

    None
}
