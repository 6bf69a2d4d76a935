use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    entities::sap_inventory, services::inventory_sync::SyncReport, ApiResponse, ApiResult,
    AppState,
};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct InventoryQuery {
    /// `available` or `assigned`
    pub status: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InventoryRow {
    pub pt_code: String,
    pub description: String,
    pub stock: Decimal,
    pub unit: String,
    pub gross_weight: Option<Decimal>,
    pub net_weight: Option<Decimal>,
    pub traceability: Option<String>,
    pub customer_lot: Option<String>,
    pub boxes: i64,
    pub assigned_delivery: Option<String>,
    pub status: String,
    pub production_date: NaiveDate,
    pub synced_at: DateTime<Utc>,
}

impl From<sap_inventory::Model> for InventoryRow {
    fn from(model: sap_inventory::Model) -> Self {
        Self {
            pt_code: model.pt_code,
            description: model.description,
            stock: model.stock,
            unit: model.unit,
            gross_weight: model.gross_weight,
            net_weight: model.net_weight,
            traceability: model.traceability,
            customer_lot: model.customer_lot,
            boxes: model.boxes,
            assigned_delivery: model.assigned_delivery,
            status: model.status,
            production_date: model.production_date,
            synced_at: model.synced_at,
        }
    }
}

/// Replace the inventory snapshot with the SAP feed
#[utoipa::path(
    post,
    path = "/api/v1/inventory/sync",
    responses(
        (status = 200, description = "Snapshot replaced", body = SyncReport),
        (status = 502, description = "SAP feed unavailable or malformed, snapshot unchanged"),
    ),
    tag = "inventory"
)]
pub async fn sync_inventory(State(state): State<AppState>) -> ApiResult<SyncReport> {
    let report = state.services.inventory_sync.sync().await?;
    Ok(Json(ApiResponse::success(report)))
}

/// Current inventory snapshot
#[utoipa::path(
    get,
    path = "/api/v1/inventory",
    params(InventoryQuery),
    responses((status = 200, description = "Snapshot rows", body = [InventoryRow])),
    tag = "inventory"
)]
pub async fn list_inventory(
    State(state): State<AppState>,
    Query(query): Query<InventoryQuery>,
) -> ApiResult<Vec<InventoryRow>> {
    let rows = state
        .services
        .inventory_sync
        .current_snapshot(query.status.as_deref())
        .await?;
    Ok(Json(ApiResponse::success(
        rows.into_iter().map(InventoryRow::from).collect(),
    )))
}

pub fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_inventory))
        .route("/sync", post(sync_inventory))
}
