//! SAP inventory reconciliation.
//!
//! The snapshot is fetched in full, inserted under a fresh sync timestamp and
//! only then are older rows removed, so readers never see an empty
//! inventory. A second pass mirrors available stock into `pallets`; its
//! failures are reported but never fail the sync.

use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use metrics::{counter, gauge};
use rust_decimal::{prelude::ToPrimitive, Decimal};
use sea_orm::{
    ActiveValue::{NotSet, Set},
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    config::SapConfig,
    entities::{
        load_pallet,
        pallet::{self, PalletSource},
        sap_inventory,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};

pub const DEFAULT_UNIT: &str = "MIL";
pub const STATUS_ASSIGNED: &str = "assigned";
pub const STATUS_AVAILABLE: &str = "available";

/// Rows per delete/insert statement in the mirror pass
const MIRROR_CHUNK: usize = 500;

/// One record of the SAP inventory feed. Numbers may arrive as JSON numbers
/// or numeric strings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SapInventoryRecord {
    #[serde(rename = "claveProducto", default, deserialize_with = "lenient_string")]
    pub pt_code: Option<String>,
    #[serde(rename = "nombreProducto", default, deserialize_with = "lenient_string")]
    pub description: Option<String>,
    #[serde(rename = "totalUnits", default, deserialize_with = "lenient_decimal")]
    pub total_units: Option<Decimal>,
    #[serde(rename = "cantidad", default, deserialize_with = "lenient_decimal")]
    pub cantidad: Option<Decimal>,
    #[serde(rename = "uom", default, deserialize_with = "lenient_string")]
    pub uom: Option<String>,
    #[serde(rename = "unidad", default, deserialize_with = "lenient_string")]
    pub unidad: Option<String>,
    #[serde(rename = "pesoBruto", default, deserialize_with = "lenient_decimal")]
    pub gross_weight: Option<Decimal>,
    #[serde(rename = "pesoNeto", default, deserialize_with = "lenient_decimal")]
    pub net_weight: Option<Decimal>,
    #[serde(rename = "lote", default, deserialize_with = "lenient_string")]
    pub traceability: Option<String>,
    #[serde(rename = "po", default, deserialize_with = "lenient_string")]
    pub customer_lot: Option<String>,
    #[serde(rename = "cajas", default, deserialize_with = "lenient_decimal")]
    pub boxes: Option<Decimal>,
    #[serde(rename = "asignadoAentrega", default, deserialize_with = "lenient_string")]
    pub assigned_delivery: Option<String>,
    #[serde(rename = "fecha", default, deserialize_with = "lenient_string")]
    pub date: Option<String>,
}

impl SapInventoryRecord {
    pub fn stock(&self) -> Decimal {
        self.total_units.or(self.cantidad).unwrap_or_default()
    }

    pub fn unit(&self) -> String {
        self.uom
            .clone()
            .or_else(|| self.unidad.clone())
            .unwrap_or_else(|| DEFAULT_UNIT.to_string())
    }

    pub fn status(&self) -> &'static str {
        if self.assigned_delivery.is_some() {
            STATUS_ASSIGNED
        } else {
            STATUS_AVAILABLE
        }
    }

    /// Production date, today when missing or unreadable.
    pub fn production_date(&self, today: NaiveDate) -> NaiveDate {
        self.date
            .as_deref()
            .and_then(parse_sap_date)
            .unwrap_or(today)
    }

    fn into_active_model(self, synced_at: DateTime<Utc>) -> sap_inventory::ActiveModel {
        let boxes = self
            .boxes
            .and_then(|b| b.trunc().to_i64())
            .unwrap_or(0);
        sap_inventory::ActiveModel {
            id: NotSet,
            stock: Set(self.stock()),
            unit: Set(self.unit()),
            status: Set(self.status().to_string()),
            production_date: Set(self.production_date(synced_at.date_naive())),
            pt_code: Set(self.pt_code.unwrap_or_default()),
            description: Set(self.description.unwrap_or_default()),
            gross_weight: Set(self.gross_weight),
            net_weight: Set(self.net_weight),
            traceability: Set(self.traceability),
            customer_lot: Set(self.customer_lot),
            boxes: Set(boxes),
            assigned_delivery: Set(self.assigned_delivery),
            synced_at: Set(synced_at),
        }
    }
}

fn parse_sap_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let head = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(head, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(head, "%d/%m/%Y"))
        .or_else(|_| NaiveDate::parse_from_str(head, "%Y%m%d"))
        .ok()
}

fn lenient_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => {
            let text = n.to_string();
            Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))
                .ok()
        }
        Some(Value::String(s)) => {
            let trimmed = s.trim().replace(',', "");
            Decimal::from_str(&trimmed).ok()
        }
        _ => None,
    })
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Outcome of mirroring available stock into `pallets`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct MirrorReport {
    pub removed_unassigned: u64,
    pub inserted: u64,
    /// Available rows whose lot is already held by a kept pallet
    pub skipped_existing: u64,
    pub virtual_superseded: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SyncReport {
    pub synced_at: DateTime<Utc>,
    pub fetched: usize,
    pub inserted: usize,
    pub removed_stale: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mirror: Option<MirrorReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mirror_error: Option<String>,
}

#[derive(Clone)]
pub struct InventorySyncService {
    db: Arc<DatabaseConnection>,
    client: reqwest::Client,
    config: SapConfig,
    event_sender: Option<EventSender>,
}

impl InventorySyncService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: SapConfig,
        event_sender: Option<EventSender>,
    ) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ServiceError::InternalError(format!("http client: {}", e)))?;
        Ok(Self {
            db,
            client,
            config,
            event_sender,
        })
    }

    /// Replaces the inventory snapshot with the current SAP feed.
    #[instrument(skip(self), fields(url = %self.config.inventory_url))]
    pub async fn sync(&self) -> Result<SyncReport, ServiceError> {
        let synced_at = Utc::now().trunc_subsecs(6);
        let records = self.fetch().await.map_err(|e| {
            counter!("bfx_portal.sync.failures", 1);
            e
        })?;
        let fetched = records.len();
        info!(fetched, "SAP inventory fetched");

        let db = &*self.db;
        let rows: Vec<sap_inventory::ActiveModel> = records
            .into_iter()
            .map(|r| r.into_active_model(synced_at))
            .collect();

        let batch_size = self.config.batch_size.max(1);
        let mut inserted = 0;
        for (batch_no, batch) in rows.chunks(batch_size).enumerate() {
            sap_inventory::Entity::insert_many(batch.to_vec())
                .exec(db)
                .await
                .map_err(|e| {
                    counter!("bfx_portal.sync.failures", 1);
                    error!(batch = batch_no, inserted, "SAP inventory batch insert failed: {}", e);
                    ServiceError::DatabaseError(e)
                })?;
            inserted += batch.len();
        }

        let removed_stale = sap_inventory::Entity::delete_many()
            .filter(sap_inventory::Column::SyncedAt.ne(synced_at))
            .exec(db)
            .await
            .map_err(|e| {
                error!("Failed to remove stale inventory rows: {}", e);
                ServiceError::DatabaseError(e)
            })?
            .rows_affected;

        counter!("bfx_portal.sync.runs", 1);
        gauge!("bfx_portal.sync.rows", fetched as f64);
        info!(inserted, removed_stale, "inventory snapshot replaced");

        if let Some(sender) = &self.event_sender {
            sender
                .send_or_log(Event::InventorySynced {
                    synced_at,
                    rows: fetched,
                })
                .await;
        }

        let (mirror, mirror_error) = match self.mirror_available(synced_at).await {
            Ok(report) => (Some(report), None),
            Err(e) => {
                counter!("bfx_portal.sync.mirror_failures", 1);
                warn!("pallet mirror pass failed: {}", e);
                (None, Some(e.to_string()))
            }
        };

        Ok(SyncReport {
            synced_at,
            fetched,
            inserted,
            removed_stale,
            mirror,
            mirror_error,
        })
    }

    /// Rows of the current snapshot, optionally narrowed to one status.
    pub async fn current_snapshot(
        &self,
        status: Option<&str>,
    ) -> Result<Vec<sap_inventory::Model>, ServiceError> {
        let mut query = sap_inventory::Entity::find();
        if let Some(status) = status {
            query = query.filter(sap_inventory::Column::Status.eq(status));
        }
        Ok(query
            .order_by_asc(sap_inventory::Column::PtCode)
            .order_by_asc(sap_inventory::Column::Id)
            .all(&*self.db)
            .await?)
    }

    async fn fetch(&self) -> Result<Vec<SapInventoryRecord>, ServiceError> {
        let response = self
            .client
            .get(&self.config.inventory_url)
            .send()
            .await
            .map_err(|e| {
                error!("SAP inventory request failed: {}", e);
                ServiceError::ExternalServiceError(format!("SAP inventory unreachable: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            error!(%status, "SAP inventory endpoint returned an error status");
            return Err(ServiceError::ExternalServiceError(format!(
                "SAP inventory endpoint returned {}",
                status
            )));
        }

        let body: Value = response.json().await.map_err(|e| {
            error!("SAP inventory response is not JSON: {}", e);
            ServiceError::ExternalApiError(format!("SAP inventory response is not JSON: {}", e))
        })?;
        parse_inventory(body)
    }

    /// Mirrors available snapshot rows into `pallets`, leaving anything
    /// assigned to a load untouched.
    async fn mirror_available(&self, synced_at: DateTime<Utc>) -> Result<MirrorReport, ServiceError> {
        let db = &*self.db;
        let mut report = MirrorReport::default();

        let assigned: HashSet<Uuid> = load_pallet::Entity::find()
            .select_only()
            .column(load_pallet::Column::PalletId)
            .into_tuple::<Uuid>()
            .all(db)
            .await?
            .into_iter()
            .collect();

        let sap_source = PalletSource::Sap.to_string();
        let stale: Vec<Uuid> = pallet::Entity::find()
            .filter(pallet::Column::Source.eq(sap_source.as_str()))
            .all(db)
            .await?
            .into_iter()
            .map(|p| p.id)
            .filter(|id| !assigned.contains(id))
            .collect();
        for chunk in stale.chunks(MIRROR_CHUNK) {
            report.removed_unassigned += pallet::Entity::delete_many()
                .filter(pallet::Column::Id.is_in(chunk.to_vec()))
                .exec(db)
                .await?
                .rows_affected;
        }

        let kept = pallet::Entity::find().all(db).await?;
        let mut held_lots: HashSet<String> = kept
            .iter()
            .filter_map(|p| p.traceability.clone())
            .collect();

        let available = sap_inventory::Entity::find()
            .filter(sap_inventory::Column::SyncedAt.eq(synced_at))
            .filter(sap_inventory::Column::Status.eq(STATUS_AVAILABLE))
            .all(db)
            .await?;

        let now = Utc::now();
        let mut new_pallets: Vec<pallet::ActiveModel> = Vec::new();
        for row in available {
            if let Some(lot) = &row.traceability {
                if !held_lots.insert(lot.clone()) {
                    report.skipped_existing += 1;
                    continue;
                }
            }
            new_pallets.push(pallet::ActiveModel {
                id: Set(Uuid::new_v4()),
                pt_code: Set(row.pt_code),
                description: Set(row.description),
                quantity: Set(row.boxes),
                gross_weight: Set(row.gross_weight),
                net_weight: Set(row.net_weight),
                unit: Set(row.unit),
                customer_lot: Set(row.customer_lot),
                bfx_order: Set(None),
                traceability: Set(row.traceability),
                status: Set(pallet::STATUS_AVAILABLE.to_string()),
                source: Set(sap_source.clone()),
                is_virtual: Set(false),
                created_at: Set(now),
                updated_at: Set(now),
            });
        }
        for chunk in new_pallets.chunks(MIRROR_CHUNK) {
            pallet::Entity::insert_many(chunk.to_vec()).exec(db).await?;
            report.inserted += chunk.len() as u64;
        }

        let real: HashSet<(String, Option<String>)> = pallet::Entity::find()
            .filter(pallet::Column::IsVirtual.eq(false))
            .all(db)
            .await?
            .into_iter()
            .map(|p| (p.pt_code, p.customer_lot))
            .collect();
        let superseded: Vec<Uuid> = pallet::Entity::find()
            .filter(pallet::Column::IsVirtual.eq(true))
            .all(db)
            .await?
            .into_iter()
            .filter(|p| !assigned.contains(&p.id))
            .filter(|p| real.contains(&(p.pt_code.clone(), p.customer_lot.clone())))
            .map(|p| p.id)
            .collect();
        for chunk in superseded.chunks(MIRROR_CHUNK) {
            report.virtual_superseded += pallet::Entity::delete_many()
                .filter(pallet::Column::Id.is_in(chunk.to_vec()))
                .exec(db)
                .await?
                .rows_affected;
        }

        if !superseded.is_empty() {
            if let Some(sender) = &self.event_sender {
                sender
                    .send_or_log(Event::VirtualPalletsSuperseded {
                        pallet_ids: superseded,
                    })
                    .await;
            }
        }

        info!(
            removed = report.removed_unassigned,
            inserted = report.inserted,
            skipped = report.skipped_existing,
            superseded = report.virtual_superseded,
            "pallet mirror pass finished"
        );
        Ok(report)
    }
}

/// The feed must be a JSON array of objects.
pub fn parse_inventory(body: Value) -> Result<Vec<SapInventoryRecord>, ServiceError> {
    let Value::Array(items) = body else {
        error!("SAP inventory response is not an array");
        return Err(ServiceError::ExternalApiError(
            "SAP inventory response is not an array".to_string(),
        ));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(idx, item)| {
            serde_json::from_value::<SapInventoryRecord>(item).map_err(|e| {
                ServiceError::ExternalApiError(format!("SAP inventory record {}: {}", idx, e))
            })
        })
        .collect()
}
