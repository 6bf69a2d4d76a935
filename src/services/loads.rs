use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Serialize;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entities::{load, load_pallet, pallet},
    errors::ServiceError,
    services::reference_data::ReferenceDataService,
};

/// One pallet assignment joined with its pallet, the flat view both
/// document generators and the release screen work from.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PalletLine {
    pub assignment_id: Uuid,
    pub pallet_id: Uuid,
    pub pt_code: String,
    pub description: String,
    /// Packages assigned to the load
    pub quantity: i64,
    pub gross_weight: Option<Decimal>,
    pub net_weight: Option<Decimal>,
    pub unit: String,
    pub customer_lot: Option<String>,
    pub bfx_order: Option<String>,
    pub traceability: Option<String>,
    pub destination: Option<String>,
    pub release_number: Option<String>,
    pub release_pdf_url: Option<String>,
    pub is_on_hold: bool,
}

impl PalletLine {
    fn from_parts(assignment: load_pallet::Model, pallet: pallet::Model) -> Self {
        Self {
            assignment_id: assignment.id,
            pallet_id: pallet.id,
            pt_code: pallet.pt_code,
            description: pallet.description,
            quantity: assignment.quantity,
            gross_weight: pallet.gross_weight,
            net_weight: pallet.net_weight,
            unit: pallet.unit,
            customer_lot: pallet.customer_lot,
            bfx_order: pallet.bfx_order,
            traceability: pallet.traceability,
            destination: assignment.destination,
            release_number: assignment.release_number,
            release_pdf_url: assignment.release_pdf_url,
            is_on_hold: assignment.is_on_hold,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct LoadDetail {
    pub id: Uuid,
    pub load_number: String,
    pub invoice_number: Option<String>,
    pub status: String,
    pub created_at: chrono::DateTime<Utc>,
    pub lines: Vec<PalletLine>,
}

/// Shipping loads and their pallet assignments
#[derive(Clone)]
pub struct LoadService {
    db: Arc<DatabaseConnection>,
}

impl LoadService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn create_load(
        &self,
        load_number: &str,
        invoice_number: Option<String>,
    ) -> Result<load::Model, ServiceError> {
        let load_number = load_number.trim();
        if load_number.is_empty() {
            return Err(ServiceError::ValidationError(
                "load number is required".to_string(),
            ));
        }

        let db = &*self.db;
        let existing = load::Entity::find()
            .filter(load::Column::LoadNumber.eq(load_number))
            .count(db)
            .await?;
        if existing > 0 {
            return Err(ServiceError::Conflict(format!(
                "load {} already exists",
                load_number
            )));
        }

        let now = Utc::now();
        let model = load::ActiveModel {
            id: Set(Uuid::new_v4()),
            load_number: Set(load_number.to_string()),
            invoice_number: Set(invoice_number.filter(|v| !v.trim().is_empty())),
            status: Set(load::STATUS_OPEN.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await
        .map_err(|e| {
            error!("Failed to create load {}: {}", load_number, e);
            ServiceError::DatabaseError(e)
        })?;

        info!(load_id = %model.id, load_number, "load created");
        Ok(model)
    }

    pub async fn list_loads(&self) -> Result<Vec<load::Model>, ServiceError> {
        Ok(load::Entity::find()
            .order_by_desc(load::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    pub async fn get_load(&self, load_id: Uuid) -> Result<load::Model, ServiceError> {
        load::Entity::find_by_id(load_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("load {} not found", load_id)))
    }

    /// Assigns a pallet to a load. A pallet can sit on one load at a time.
    #[instrument(skip(self))]
    pub async fn assign_pallet(
        &self,
        load_id: Uuid,
        pallet_id: Uuid,
        quantity: Option<i64>,
        destination: Option<String>,
    ) -> Result<load_pallet::Model, ServiceError> {
        let db = &*self.db;
        self.get_load(load_id).await?;

        let pallet = pallet::Entity::find_by_id(pallet_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("pallet {} not found", pallet_id)))?;

        let quantity = quantity.unwrap_or(pallet.quantity);
        if quantity <= 0 || quantity > pallet.quantity {
            return Err(ServiceError::ValidationError(format!(
                "quantity must be between 1 and {}",
                pallet.quantity
            )));
        }

        let destination = match destination.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => Some(
                ReferenceDataService::new(self.db.clone())
                    .find_destination(name)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("destination {} not found", name))
                    })?
                    .name,
            ),
            _ => None,
        };

        let already_assigned = load_pallet::Entity::find()
            .filter(load_pallet::Column::PalletId.eq(pallet_id))
            .count(db)
            .await?;
        if already_assigned > 0 {
            warn!(%pallet_id, "pallet is already assigned to a load");
            return Err(ServiceError::Conflict(format!(
                "pallet {} is already assigned to a load",
                pallet_id
            )));
        }

        let now = Utc::now();
        let assignment = load_pallet::ActiveModel {
            id: Set(Uuid::new_v4()),
            load_id: Set(load_id),
            pallet_id: Set(pallet_id),
            quantity: Set(quantity),
            destination: Set(destination),
            release_number: Set(None),
            release_pdf_url: Set(None),
            is_on_hold: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await
        .map_err(|e| {
            error!("Failed to assign pallet {} to load {}: {}", pallet_id, load_id, e);
            ServiceError::DatabaseError(e)
        })?;

        info!(assignment_id = %assignment.id, %load_id, %pallet_id, quantity, "pallet assigned");
        Ok(assignment)
    }

    /// The load plus its assignments, in assignment order.
    #[instrument(skip(self))]
    pub async fn load_detail(&self, load_id: Uuid) -> Result<LoadDetail, ServiceError> {
        let load = self.get_load(load_id).await?;
        let lines = self.pallet_lines(load_id).await?;
        Ok(LoadDetail {
            id: load.id,
            load_number: load.load_number,
            invoice_number: load.invoice_number,
            status: load.status,
            created_at: load.created_at,
            lines,
        })
    }

    pub(crate) async fn pallet_lines(&self, load_id: Uuid) -> Result<Vec<PalletLine>, ServiceError> {
        let rows = load_pallet::Entity::find()
            .filter(load_pallet::Column::LoadId.eq(load_id))
            .find_also_related(pallet::Entity)
            .order_by_asc(load_pallet::Column::CreatedAt)
            .order_by_asc(load_pallet::Column::Id)
            .all(&*self.db)
            .await?;

        let mut lines = Vec::with_capacity(rows.len());
        for (assignment, pallet) in rows {
            match pallet {
                Some(pallet) => lines.push(PalletLine::from_parts(assignment, pallet)),
                None => warn!(
                    assignment_id = %assignment.id,
                    pallet_id = %assignment.pallet_id,
                    "assignment references a missing pallet"
                ),
            }
        }
        Ok(lines)
    }
}
