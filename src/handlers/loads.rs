use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::common::{attachment_response, decode_base64, validate_input, DocumentDateQuery};
use crate::{
    entities::{load, load_pallet},
    errors::ServiceError,
    services::{
        document_extraction::PdfSource,
        loads::LoadDetail,
        release::{ReleaseOutcome, ReleaseRequest, ReleaseValidation},
    },
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateLoadRequest {
    #[validate(length(min = 1, max = 64))]
    #[schema(example = "L-2201")]
    pub load_number: String,
    #[schema(example = "F-88120")]
    pub invoice_number: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoadSummary {
    pub id: Uuid,
    pub load_number: String,
    pub invoice_number: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<load::Model> for LoadSummary {
    fn from(model: load::Model) -> Self {
        Self {
            id: model.id,
            load_number: model.load_number,
            invoice_number: model.invoice_number,
            status: model.status,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AssignPalletRequest {
    pub pallet_id: Uuid,
    /// Packages to ship, the whole pallet when omitted
    #[validate(range(min = 1))]
    pub quantity: Option<i64>,
    #[schema(example = "LAREDO")]
    pub destination: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AssignmentSummary {
    pub id: Uuid,
    pub load_id: Uuid,
    pub pallet_id: Uuid,
    pub quantity: i64,
    pub destination: Option<String>,
    pub release_number: Option<String>,
    pub release_pdf_url: Option<String>,
    pub is_on_hold: bool,
}

impl From<load_pallet::Model> for AssignmentSummary {
    fn from(model: load_pallet::Model) -> Self {
        Self {
            id: model.id,
            load_id: model.load_id,
            pallet_id: model.pallet_id,
            quantity: model.quantity,
            destination: model.destination,
            release_number: model.release_number,
            release_pdf_url: model.release_pdf_url,
            is_on_hold: model.is_on_hold,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ReleasePalletsRequest {
    #[validate(length(min = 1))]
    pub assignment_ids: Vec<Uuid>,
    #[validate(length(min = 1, max = 64))]
    #[schema(example = "REL-4471")]
    pub release_number: String,
    #[validate(length(min = 1))]
    #[schema(example = "LAREDO")]
    pub destination: String,
    /// Signed release authorization, base64 encoded
    pub pdf_base64: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct HoldPalletsRequest {
    #[validate(length(min = 1))]
    pub assignment_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HoldResponse {
    pub load_id: Uuid,
    pub assignments_updated: u64,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ValidateReleaseRequest {
    #[validate(length(min = 1))]
    pub assignment_ids: Vec<Uuid>,
    /// Publicly reachable PDF
    pub pdf_url: Option<String>,
    /// Inline PDF, base64 encoded
    pub pdf_base64: Option<String>,
}

impl ValidateReleaseRequest {
    fn source(&self) -> Result<PdfSource, ServiceError> {
        match (&self.pdf_url, &self.pdf_base64) {
            (Some(url), _) if !url.trim().is_empty() => Ok(PdfSource::Url(url.trim().to_string())),
            (_, Some(data)) if !data.trim().is_empty() => {
                let bytes = decode_base64("pdf_base64", data)?;
                Ok(PdfSource::from_bytes(&bytes))
            }
            _ => Err(ServiceError::ValidationError(
                "pdf_url or pdf_base64 is required".to_string(),
            )),
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PackingListQuery {
    /// Destination to print, matched without regard to case
    pub destination: String,
    /// Document date (YYYY-MM-DD)
    pub date: Option<chrono::NaiveDate>,
}

/// Create a shipping load
#[utoipa::path(
    post,
    path = "/api/v1/loads",
    request_body = CreateLoadRequest,
    responses(
        (status = 201, description = "Load created", body = LoadSummary),
        (status = 400, description = "Invalid request"),
        (status = 409, description = "Load number already exists"),
    ),
    tag = "loads"
)]
pub async fn create_load(
    State(state): State<AppState>,
    Json(payload): Json<CreateLoadRequest>,
) -> Result<(StatusCode, Json<ApiResponse<LoadSummary>>), ServiceError> {
    validate_input(&payload)?;
    let load = state
        .services
        .loads
        .create_load(&payload.load_number, payload.invoice_number)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(load.into()))))
}

/// List loads, newest first
#[utoipa::path(
    get,
    path = "/api/v1/loads",
    responses((status = 200, description = "Loads", body = [LoadSummary])),
    tag = "loads"
)]
pub async fn list_loads(State(state): State<AppState>) -> ApiResult<Vec<LoadSummary>> {
    let loads = state.services.loads.list_loads().await?;
    Ok(Json(ApiResponse::success(
        loads.into_iter().map(LoadSummary::from).collect(),
    )))
}

/// Load with its pallet assignments
#[utoipa::path(
    get,
    path = "/api/v1/loads/{id}",
    params(("id" = Uuid, Path, description = "Load ID")),
    responses(
        (status = 200, description = "Load detail", body = LoadDetail),
        (status = 404, description = "Load not found"),
    ),
    tag = "loads"
)]
pub async fn get_load(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<LoadDetail> {
    let detail = state.services.loads.load_detail(id).await?;
    Ok(Json(ApiResponse::success(detail)))
}

/// Assign a pallet to a load
#[utoipa::path(
    post,
    path = "/api/v1/loads/{id}/pallets",
    params(("id" = Uuid, Path, description = "Load ID")),
    request_body = AssignPalletRequest,
    responses(
        (status = 201, description = "Pallet assigned", body = AssignmentSummary),
        (status = 404, description = "Load, pallet or destination not found"),
        (status = 409, description = "Pallet already on a load"),
    ),
    tag = "loads"
)]
pub async fn assign_pallet(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignPalletRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AssignmentSummary>>), ServiceError> {
    validate_input(&payload)?;
    let assignment = state
        .services
        .loads
        .assign_pallet(id, payload.pallet_id, payload.quantity, payload.destination)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(assignment.into())),
    ))
}

/// Release selected pallets to a destination
#[utoipa::path(
    post,
    path = "/api/v1/loads/{id}/release",
    params(("id" = Uuid, Path, description = "Load ID")),
    request_body = ReleasePalletsRequest,
    responses(
        (status = 200, description = "Pallets released", body = ReleaseOutcome),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Load, assignment or destination not found"),
    ),
    tag = "releases"
)]
pub async fn release_pallets(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReleasePalletsRequest>,
) -> ApiResult<ReleaseOutcome> {
    validate_input(&payload)?;
    let pdf = payload
        .pdf_base64
        .as_deref()
        .filter(|data| !data.trim().is_empty())
        .map(|data| decode_base64("pdf_base64", data))
        .transpose()?;

    let outcome = state
        .services
        .releases
        .release(
            id,
            ReleaseRequest {
                assignment_ids: payload.assignment_ids,
                release_number: payload.release_number,
                destination: payload.destination,
                pdf,
            },
        )
        .await?;
    Ok(Json(ApiResponse::success(outcome)))
}

/// Put selected pallets on hold
#[utoipa::path(
    post,
    path = "/api/v1/loads/{id}/hold",
    params(("id" = Uuid, Path, description = "Load ID")),
    request_body = HoldPalletsRequest,
    responses(
        (status = 200, description = "Pallets on hold", body = HoldResponse),
        (status = 404, description = "Load or assignment not found"),
    ),
    tag = "releases"
)]
pub async fn hold_pallets(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<HoldPalletsRequest>,
) -> ApiResult<HoldResponse> {
    validate_input(&payload)?;
    let updated = state
        .services
        .releases
        .put_on_hold(id, &payload.assignment_ids)
        .await?;
    Ok(Json(ApiResponse::success(HoldResponse {
        load_id: id,
        assignments_updated: updated,
    })))
}

/// Check a release document against the selected pallets
#[utoipa::path(
    post,
    path = "/api/v1/loads/{id}/release/validate",
    params(("id" = Uuid, Path, description = "Load ID")),
    request_body = ValidateReleaseRequest,
    responses(
        (status = 200, description = "Verified, or manual entry with a warning", body = ReleaseValidation),
        (status = 404, description = "No selected assignments on the load"),
    ),
    tag = "releases"
)]
pub async fn validate_release(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ValidateReleaseRequest>,
) -> ApiResult<ReleaseValidation> {
    validate_input(&payload)?;
    let source = payload.source()?;
    let validation = state
        .services
        .releases
        .validate_for_assignments(id, &payload.assignment_ids, &source)
        .await?;
    Ok(Json(ApiResponse::success(validation)))
}

/// Download the customs workbook for a load
#[utoipa::path(
    get,
    path = "/api/v1/loads/{id}/customs-document",
    params(("id" = Uuid, Path, description = "Load ID"), DocumentDateQuery),
    responses(
        (status = 200, description = "xlsx workbook", content_type = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
        (status = 404, description = "Load not found"),
    ),
    tag = "documents"
)]
pub async fn customs_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<DocumentDateQuery>,
) -> Result<Response, ServiceError> {
    let document = state
        .services
        .documents
        .customs_document(id, query.resolve())
        .await?;
    attachment_response(document)
}

/// Download the packing list for one destination of a load
#[utoipa::path(
    get,
    path = "/api/v1/loads/{id}/packing-list",
    params(("id" = Uuid, Path, description = "Load ID"), PackingListQuery),
    responses(
        (status = 200, description = "PDF packing list", content_type = "application/pdf"),
        (status = 400, description = "No pallets for the destination"),
        (status = 404, description = "Load or destination not found"),
    ),
    tag = "documents"
)]
pub async fn packing_list(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<PackingListQuery>,
) -> Result<Response, ServiceError> {
    let date = DocumentDateQuery { date: query.date }.resolve();
    let document = state
        .services
        .documents
        .packing_list(id, &query.destination, date)
        .await?;
    attachment_response(document)
}

pub fn load_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_load).get(list_loads))
        .route("/:id", get(get_load))
        .route("/:id/pallets", post(assign_pallet))
        .route("/:id/release", post(release_pallets))
        .route("/:id/release/validate", post(validate_release))
        .route("/:id/hold", post(hold_pallets))
        .route("/:id/customs-document", get(customs_document))
        .route("/:id/packing-list", get(packing_list))
}
