use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::common::validate_input;
use crate::{
    entities::pallet,
    errors::ServiceError,
    services::pallets::{BulkUpdateReport, NewVirtualPallet},
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PalletQuery {
    pub status: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PalletSummary {
    pub id: Uuid,
    pub pt_code: String,
    pub description: String,
    pub quantity: i64,
    pub gross_weight: Option<Decimal>,
    pub net_weight: Option<Decimal>,
    pub unit: String,
    pub customer_lot: Option<String>,
    pub bfx_order: Option<String>,
    pub traceability: Option<String>,
    pub status: String,
    pub source: String,
    pub is_virtual: bool,
}

impl From<pallet::Model> for PalletSummary {
    fn from(model: pallet::Model) -> Self {
        Self {
            id: model.id,
            pt_code: model.pt_code,
            description: model.description,
            quantity: model.quantity,
            gross_weight: model.gross_weight,
            net_weight: model.net_weight,
            unit: model.unit,
            customer_lot: model.customer_lot,
            bfx_order: model.bfx_order,
            traceability: model.traceability,
            status: model.status,
            source: model.source,
            is_virtual: model.is_virtual,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateVirtualPalletRequest {
    #[validate(length(min = 1, max = 64))]
    #[schema(example = "PT-10442")]
    pub pt_code: String,
    #[validate(length(min = 1))]
    #[schema(example = "BOLSA 25KG IMPRESA")]
    pub description: String,
    #[validate(range(min = 1))]
    #[schema(example = 50)]
    pub quantity: i64,
    #[validate(length(min = 1))]
    #[schema(example = "bags")]
    pub unit: String,
    pub customer_lot: Option<String>,
    pub bfx_order: Option<String>,
    pub gross_weight: Option<Decimal>,
    pub net_weight: Option<Decimal>,
}

/// List pallets
#[utoipa::path(
    get,
    path = "/api/v1/pallets",
    params(PalletQuery),
    responses((status = 200, description = "Pallets", body = [PalletSummary])),
    tag = "pallets"
)]
pub async fn list_pallets(
    State(state): State<AppState>,
    Query(query): Query<PalletQuery>,
) -> ApiResult<Vec<PalletSummary>> {
    let pallets = state
        .services
        .pallets
        .list_pallets(query.status.as_deref())
        .await?;
    Ok(Json(ApiResponse::success(
        pallets.into_iter().map(PalletSummary::from).collect(),
    )))
}

/// Create a placeholder pallet for product not yet reported by SAP
#[utoipa::path(
    post,
    path = "/api/v1/pallets/virtual",
    request_body = CreateVirtualPalletRequest,
    responses(
        (status = 201, description = "Virtual pallet created", body = PalletSummary),
        (status = 400, description = "Invalid request"),
    ),
    tag = "pallets"
)]
pub async fn create_virtual_pallet(
    State(state): State<AppState>,
    Json(payload): Json<CreateVirtualPalletRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PalletSummary>>), ServiceError> {
    validate_input(&payload)?;
    let pallet = state
        .services
        .pallets
        .create_virtual_pallet(NewVirtualPallet {
            pt_code: payload.pt_code,
            description: payload.description,
            quantity: payload.quantity,
            unit: payload.unit,
            customer_lot: payload.customer_lot,
            bfx_order: payload.bfx_order,
            gross_weight: payload.gross_weight,
            net_weight: payload.net_weight,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(pallet.into()))))
}

/// Apply a CSV of pallet edits
#[utoipa::path(
    post,
    path = "/api/v1/pallets/bulk-update",
    request_body(content = String, content_type = "text/csv"),
    responses(
        (status = 200, description = "Per-row results", body = BulkUpdateReport),
        (status = 400, description = "Empty file or no id column"),
    ),
    tag = "pallets"
)]
pub async fn bulk_update(
    State(state): State<AppState>,
    body: String,
) -> ApiResult<BulkUpdateReport> {
    let report = state.services.pallets.bulk_update_from_csv(&body).await?;
    Ok(Json(ApiResponse::success(report)))
}

pub fn pallet_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_pallets))
        .route("/virtual", post(create_virtual_pallet))
        .route("/bulk-update", post(bulk_update))
}
