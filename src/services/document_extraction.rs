//! Client for the external document-extraction service.
//!
//! Extraction is a best-effort enhancement: every call resolves to an
//! [`ExtractionOutcome`], never to an error, so callers can fall back to
//! manual entry.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use crate::config::ExtractionConfig;
use crate::errors::ServiceError;

pub const NOT_CONFIGURED: &str = "document extraction is not configured";

/// Result of an extraction call
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExtractionOutcome<T> {
    Success(T),
    Failure { reason: String },
}

impl<T> ExtractionOutcome<T> {
    pub fn failure(reason: impl Into<String>) -> Self {
        ExtractionOutcome::Failure {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExtractionOutcome::Success(_))
    }
}

/// PDF handed to the extractor, either by reference or inline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PdfSource {
    Url(String),
    Base64(String),
}

impl PdfSource {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        PdfSource::Base64(STANDARD.encode(bytes))
    }
}

/// Product the caller expects to find in the document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ExpectedProduct {
    pub pt_code: String,
    pub description: String,
    pub customer_lot: Option<String>,
}

/// Product as reported back by the extractor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ExtractedProduct {
    #[serde(default, alias = "ptCode")]
    pub pt_code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "customerLot")]
    pub customer_lot: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseValidationReport {
    #[serde(default)]
    pub valid: bool,
    #[serde(default)]
    pub release_number: Option<String>,
    #[serde(default)]
    pub matched_products: Vec<ExtractedProduct>,
    #[serde(default)]
    pub unmatched_products: Vec<ExtractedProduct>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Fields read from a customer purchase order PDF
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PurchaseOrderExtraction {
    #[serde(default)]
    pub po_number: Option<String>,
    #[serde(default)]
    pub po_date: Option<String>,
    #[serde(default)]
    pub quantity: Option<Decimal>,
    #[serde(default)]
    pub price_per_thousand: Option<Decimal>,
    #[serde(default)]
    pub pt_code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub delivery_date: Option<String>,
}

#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    async fn validate_release(
        &self,
        pdf: &PdfSource,
        expected_products: &[ExpectedProduct],
    ) -> ExtractionOutcome<ReleaseValidationReport>;

    async fn extract_purchase_order(
        &self,
        pdf: &PdfSource,
    ) -> ExtractionOutcome<PurchaseOrderExtraction>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExtractionRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pdf_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pdf_base64: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expected_products: Option<&'a [ExpectedProduct]>,
}

impl<'a> ExtractionRequest<'a> {
    fn new(pdf: &'a PdfSource, expected_products: Option<&'a [ExpectedProduct]>) -> Self {
        let (pdf_url, pdf_base64) = match pdf {
            PdfSource::Url(url) => (Some(url.as_str()), None),
            PdfSource::Base64(data) => (None, Some(data.as_str())),
        };
        Self {
            pdf_url,
            pdf_base64,
            expected_products,
        }
    }
}

/// Talks JSON over HTTP to the extraction endpoint
#[derive(Clone)]
pub struct HttpDocumentExtractor {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpDocumentExtractor {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::InternalError(format!("http client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    async fn post<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        request: &ExtractionRequest<'_>,
    ) -> ExtractionOutcome<T> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let mut builder = self.client.post(&url).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(%url, "extraction request failed: {}", e);
                return ExtractionOutcome::failure(format!("extraction service unreachable: {}", e));
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(%url, %status, "extraction service returned an error status");
            return ExtractionOutcome::failure(format!(
                "extraction service returned {}",
                status
            ));
        }

        match response.json::<T>().await {
            Ok(body) => ExtractionOutcome::Success(body),
            Err(e) => {
                warn!(%url, "extraction response could not be decoded: {}", e);
                ExtractionOutcome::failure(format!("malformed extraction response: {}", e))
            }
        }
    }
}

#[async_trait]
impl DocumentExtractor for HttpDocumentExtractor {
    #[instrument(skip_all, fields(expected = expected_products.len()))]
    async fn validate_release(
        &self,
        pdf: &PdfSource,
        expected_products: &[ExpectedProduct],
    ) -> ExtractionOutcome<ReleaseValidationReport> {
        let request = ExtractionRequest::new(pdf, Some(expected_products));
        self.post("validate-release", &request).await
    }

    #[instrument(skip_all)]
    async fn extract_purchase_order(
        &self,
        pdf: &PdfSource,
    ) -> ExtractionOutcome<PurchaseOrderExtraction> {
        let request = ExtractionRequest::new(pdf, None);
        self.post("extract-po", &request).await
    }
}

/// Stand-in used when no extraction endpoint is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledExtractor;

#[async_trait]
impl DocumentExtractor for DisabledExtractor {
    async fn validate_release(
        &self,
        _pdf: &PdfSource,
        _expected_products: &[ExpectedProduct],
    ) -> ExtractionOutcome<ReleaseValidationReport> {
        ExtractionOutcome::failure(NOT_CONFIGURED)
    }

    async fn extract_purchase_order(
        &self,
        _pdf: &PdfSource,
    ) -> ExtractionOutcome<PurchaseOrderExtraction> {
        ExtractionOutcome::failure(NOT_CONFIGURED)
    }
}

/// Picks the HTTP extractor when a base URL is configured.
pub fn extractor_from_config(
    config: &ExtractionConfig,
) -> Result<Arc<dyn DocumentExtractor>, ServiceError> {
    match config.base_url.as_deref().map(str::trim) {
        Some(base_url) if !base_url.is_empty() => {
            info!(base_url, "document extraction enabled");
            Ok(Arc::new(HttpDocumentExtractor::new(
                base_url,
                config.api_key.clone(),
                Duration::from_secs(config.timeout_secs),
            )?))
        }
        _ => {
            info!("document extraction disabled");
            Ok(Arc::new(DisabledExtractor))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn expected() -> Vec<ExpectedProduct> {
        vec![ExpectedProduct {
            pt_code: "PT-1001".into(),
            description: "Bolsa 25kg".into(),
            customer_lot: Some("PO-77".into()),
        }]
    }

    fn extractor(server: &MockServer) -> HttpDocumentExtractor {
        HttpDocumentExtractor::new(server.uri(), Some("secret".into()), Duration::from_secs(5))
            .unwrap()
    }

    #[tokio::test]
    async fn validate_release_posts_camel_case_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/validate-release"))
            .and(header("authorization", "Bearer secret"))
            .and(body_partial_json(json!({
                "pdfUrl": "http://files.local/r.pdf",
                "expectedProducts": [{"pt_code": "PT-1001"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "valid": true,
                "releaseNumber": "R-5521",
                "matchedProducts": [{"ptCode": "PT-1001", "description": "Bolsa 25kg"}],
                "unmatchedProducts": [],
                "message": "all products found"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = extractor(&server)
            .validate_release(&PdfSource::Url("http://files.local/r.pdf".into()), &expected())
            .await;

        assert_matches!(outcome, ExtractionOutcome::Success(report) => {
            assert!(report.valid);
            assert_eq!(report.release_number.as_deref(), Some("R-5521"));
            assert_eq!(report.matched_products[0].pt_code.as_deref(), Some("PT-1001"));
        });
    }

    #[tokio::test]
    async fn extract_purchase_order_accepts_string_numbers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/extract-po"))
            .and(body_partial_json(json!({ "pdfBase64": "JVBERi0=" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "po_number": "PO-900",
                "quantity": "150000",
                "price_per_thousand": 812.5
            })))
            .mount(&server)
            .await;

        let outcome = extractor(&server)
            .extract_purchase_order(&PdfSource::from_bytes(b"%PDF-"))
            .await;

        assert_matches!(outcome, ExtractionOutcome::Success(po) => {
            assert_eq!(po.po_number.as_deref(), Some("PO-900"));
            assert_eq!(po.quantity, Some(dec!(150000)));
            assert_eq!(po.price_per_thousand, Some(dec!(812.5)));
            assert!(po.delivery_date.is_none());
        });
    }

    #[tokio::test]
    async fn error_status_becomes_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let outcome = extractor(&server)
            .validate_release(&PdfSource::Url("u".into()), &expected())
            .await;
        assert_matches!(outcome, ExtractionOutcome::Failure { reason } if reason.contains("503"));
    }

    #[tokio::test]
    async fn malformed_body_becomes_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let outcome = extractor(&server)
            .extract_purchase_order(&PdfSource::Url("u".into()))
            .await;
        assert_matches!(outcome, ExtractionOutcome::Failure { .. });
    }

    #[tokio::test]
    async fn unreachable_endpoint_becomes_failure() {
        let extractor =
            HttpDocumentExtractor::new("http://127.0.0.1:9", None, Duration::from_secs(1)).unwrap();
        let outcome = extractor
            .validate_release(&PdfSource::Url("u".into()), &expected())
            .await;
        assert!(!outcome.is_success());
    }

    #[tokio::test]
    async fn disabled_extractor_always_fails() {
        let outcome = DisabledExtractor
            .validate_release(&PdfSource::Url("u".into()), &[])
            .await;
        assert_eq!(outcome, ExtractionOutcome::failure(NOT_CONFIGURED));
    }
}
