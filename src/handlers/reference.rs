//! Destinations and purchase order reference data.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::common::{decode_base64, validate_input};
use crate::{
    entities::{destination, purchase_order},
    errors::ServiceError,
    services::{
        document_extraction::{ExtractionOutcome, PdfSource, PurchaseOrderExtraction},
        reference_data::{NewDestination, PurchaseOrderInfo},
    },
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct DestinationSummary {
    pub id: i32,
    pub name: String,
    pub address_lines: Vec<String>,
    pub client_code: String,
    pub client_name: String,
    pub sales_person: Option<String>,
}

impl From<destination::Model> for DestinationSummary {
    fn from(model: destination::Model) -> Self {
        Self {
            address_lines: model.address_lines(),
            id: model.id,
            name: model.name,
            client_code: model.client_code,
            client_name: model.client_name,
            sales_person: model.sales_person,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateDestinationRequest {
    #[validate(length(min = 1, max = 128))]
    #[schema(example = "LAREDO")]
    pub name: String,
    #[serde(default)]
    pub address_lines: Vec<String>,
    #[validate(length(min = 1))]
    #[schema(example = "C-1001")]
    pub client_code: String,
    #[validate(length(min = 1))]
    #[schema(example = "ACME FOODS")]
    pub client_name: String,
    pub sales_person: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PurchaseOrderSummary {
    pub customer_lot: String,
    pub sales_order_number: Option<String>,
    pub price_per_thousand: Decimal,
    pub pieces_per_pallet: Option<i64>,
    pub pieces_per_package: Option<i64>,
    pub customer_item_code: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<purchase_order::Model> for PurchaseOrderSummary {
    fn from(model: purchase_order::Model) -> Self {
        Self {
            customer_lot: model.customer_lot,
            sales_order_number: model.sales_order_number,
            price_per_thousand: model.price_per_thousand,
            pieces_per_pallet: model.pieces_per_pallet,
            pieces_per_package: model.piezas_por_paquete,
            customer_item_code: model.customer_item_code,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpsertPurchaseOrderRequest {
    #[validate(length(min = 1, max = 64))]
    #[schema(example = "PO-55120")]
    pub customer_lot: String,
    #[schema(example = "SO-7781")]
    pub sales_order_number: Option<String>,
    #[schema(example = "1820.00")]
    pub price_per_thousand: Decimal,
    #[validate(range(min = 1))]
    pub pieces_per_pallet: Option<i64>,
    #[validate(range(min = 1))]
    pub pieces_per_package: Option<i64>,
    pub customer_item_code: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ExtractPurchaseOrderRequest {
    #[validate(length(min = 1))]
    pub pdf_base64: String,
}

/// Extracted fields, or the reason extraction was not possible
#[derive(Debug, Serialize, ToSchema)]
pub struct PurchaseOrderExtractionResponse {
    pub extracted: Option<PurchaseOrderExtraction>,
    pub warning: Option<String>,
}

/// List destinations
#[utoipa::path(
    get,
    path = "/api/v1/destinations",
    responses((status = 200, description = "Destinations", body = [DestinationSummary])),
    tag = "reference"
)]
pub async fn list_destinations(State(state): State<AppState>) -> ApiResult<Vec<DestinationSummary>> {
    let destinations = state.services.reference.list_destinations().await?;
    Ok(Json(ApiResponse::success(
        destinations.into_iter().map(DestinationSummary::from).collect(),
    )))
}

/// Create a destination
#[utoipa::path(
    post,
    path = "/api/v1/destinations",
    request_body = CreateDestinationRequest,
    responses(
        (status = 201, description = "Destination created", body = DestinationSummary),
        (status = 409, description = "Destination already exists"),
    ),
    tag = "reference"
)]
pub async fn create_destination(
    State(state): State<AppState>,
    Json(payload): Json<CreateDestinationRequest>,
) -> Result<(StatusCode, Json<ApiResponse<DestinationSummary>>), ServiceError> {
    validate_input(&payload)?;
    let destination = state
        .services
        .reference
        .create_destination(NewDestination {
            name: payload.name,
            address_lines: payload.address_lines,
            client_code: payload.client_code,
            client_name: payload.client_name,
            sales_person: payload.sales_person,
        })
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(destination.into())),
    ))
}

/// List purchase order reference data
#[utoipa::path(
    get,
    path = "/api/v1/purchase-orders",
    responses((status = 200, description = "Purchase orders", body = [PurchaseOrderSummary])),
    tag = "reference"
)]
pub async fn list_purchase_orders(
    State(state): State<AppState>,
) -> ApiResult<Vec<PurchaseOrderSummary>> {
    let orders = state.services.reference.list_purchase_orders().await?;
    Ok(Json(ApiResponse::success(
        orders.into_iter().map(PurchaseOrderSummary::from).collect(),
    )))
}

/// Insert or replace the purchase order info for a customer lot
#[utoipa::path(
    put,
    path = "/api/v1/purchase-orders",
    request_body = UpsertPurchaseOrderRequest,
    responses(
        (status = 200, description = "Purchase order stored", body = PurchaseOrderSummary),
        (status = 400, description = "Invalid request"),
    ),
    tag = "reference"
)]
pub async fn upsert_purchase_order(
    State(state): State<AppState>,
    Json(payload): Json<UpsertPurchaseOrderRequest>,
) -> ApiResult<PurchaseOrderSummary> {
    validate_input(&payload)?;
    let order = state
        .services
        .reference
        .upsert_purchase_order(PurchaseOrderInfo {
            customer_lot: payload.customer_lot,
            sales_order_number: payload.sales_order_number,
            price_per_thousand: payload.price_per_thousand,
            pieces_per_pallet: payload.pieces_per_pallet,
            pieces_per_package: payload.pieces_per_package,
            customer_item_code: payload.customer_item_code,
        })
        .await?;
    Ok(Json(ApiResponse::success(order.into())))
}

/// Read the fields of a customer purchase order PDF
#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders/extract",
    request_body = ExtractPurchaseOrderRequest,
    responses((status = 200, description = "Extracted fields or a warning", body = PurchaseOrderExtractionResponse)),
    tag = "reference"
)]
pub async fn extract_purchase_order(
    State(state): State<AppState>,
    Json(payload): Json<ExtractPurchaseOrderRequest>,
) -> ApiResult<PurchaseOrderExtractionResponse> {
    validate_input(&payload)?;
    let bytes = decode_base64("pdf_base64", &payload.pdf_base64)?;
    let source = PdfSource::from_bytes(&bytes);

    let response = match state.services.extractor.extract_purchase_order(&source).await {
        ExtractionOutcome::Success(extracted) => PurchaseOrderExtractionResponse {
            extracted: Some(extracted),
            warning: None,
        },
        ExtractionOutcome::Failure { reason } => PurchaseOrderExtractionResponse {
            extracted: None,
            warning: Some(format!(
                "Purchase order could not be read automatically ({}). Enter the fields manually.",
                reason
            )),
        },
    };
    Ok(Json(ApiResponse::success(response)))
}

pub fn destination_routes() -> Router<AppState> {
    Router::new().route("/", get(list_destinations).post(create_destination))
}

pub fn purchase_order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_purchase_orders).put(upsert_purchase_order))
        .route("/extract", post(extract_purchase_order))
}
