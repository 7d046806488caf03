//! KYC document classification and extraction server.
//!
//! Classifies a document image (bank cheque, Aadhar card, PAN card, ration
//! card, or unknown) fetched from a URL, then extracts its fields via the
//! document-analysis and chat-completion services.

mod classify;
mod completion;
mod config;
mod error;
mod extract;
mod fetch;
mod ocr;

use axum::extract::State;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use classify::Classifier;
use completion::openai::OpenAiClient;
use config::Settings;
use error::Error;
use extract::{ExtractionOutput, Extractor};
use fetch::HttpFetcher;
use ocr::azure::AzureDocIntelClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application state shared across handlers. Collaborator clients are built
/// once at startup and held for the process lifetime.
#[derive(Clone)]
struct AppState {
    classifier: Classifier,
    extractor: Extractor,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kyc_extractor=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::from_env()?;

    // One bounded HTTP client shared by every collaborator.
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(60))
        .build()?;

    let analyzer = Arc::new(AzureDocIntelClient::new(
        http.clone(),
        settings.docintel_endpoint.clone(),
        settings.docintel_key.clone(),
    ));
    let openai = Arc::new(OpenAiClient::new(http.clone(), settings.openai_api_key.clone()));
    let fetcher = Arc::new(HttpFetcher::new(http));

    let state = AppState {
        classifier: Classifier::new(analyzer.clone()),
        extractor: Extractor::new(analyzer, openai, fetcher),
    };

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr).await?;
    info!("Server listening on http://{}", settings.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/process_document", post(process_document))
        .route("/document_details", post(document_details))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

#[derive(Debug, Deserialize)]
struct DocumentRequest {
    document_url: Option<String>,
}

#[derive(Debug, Serialize)]
struct BankDetailsResponse {
    bank_details: String,
}

#[derive(Debug, Serialize)]
struct DocumentDetailsResponse {
    document_type: String,
    document_details: ExtractionOutput,
}

/// Legacy cheque-only path: read-model OCR plus the cheque prompt, no
/// classification.
async fn process_document(
    State(state): State<AppState>,
    Json(body): Json<DocumentRequest>,
) -> Result<Json<BankDetailsResponse>, Error> {
    let document_url = body.document_url.ok_or(Error::MissingDocumentUrl)?;

    let bank_details = state.extractor.extract_bank_cheque(&document_url).await?;
    Ok(Json(BankDetailsResponse { bank_details }))
}

/// Classify the document, then run the extractor for its category.
async fn document_details(
    State(state): State<AppState>,
    Json(body): Json<DocumentRequest>,
) -> Result<Json<DocumentDetailsResponse>, Error> {
    let document_url = body.document_url.ok_or(Error::MissingDocumentUrl)?;

    // Analysis calls take the percent-decoded URL; the image fetch uses the
    // URL exactly as given.
    let decoded = urlencoding::decode(&document_url)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| document_url.clone());

    let category = state.classifier.classify(&decoded).await?;
    info!("Classified document as {}", category);

    let document_details = state.extractor.extract(category, &document_url).await?;

    Ok(Json(DocumentDetailsResponse {
        document_type: category.as_str().to_string(),
        document_details,
    }))
}
