//! Destinations and purchase order info, the lookup tables the document
//! generators read from.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::OnConflict, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, Set,
};
use tracing::{info, instrument};

use crate::{
    entities::{destination, purchase_order},
    errors::ServiceError,
};

#[derive(Debug, Clone)]
pub struct NewDestination {
    pub name: String,
    pub address_lines: Vec<String>,
    pub client_code: String,
    pub client_name: String,
    pub sales_person: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PurchaseOrderInfo {
    pub customer_lot: String,
    pub sales_order_number: Option<String>,
    pub price_per_thousand: Decimal,
    pub pieces_per_pallet: Option<i64>,
    pub pieces_per_package: Option<i64>,
    pub customer_item_code: Option<String>,
}

#[derive(Clone)]
pub struct ReferenceDataService {
    db: Arc<DatabaseConnection>,
}

impl ReferenceDataService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_destination(
        &self,
        input: NewDestination,
    ) -> Result<destination::Model, ServiceError> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(ServiceError::ValidationError(
                "destination name is required".to_string(),
            ));
        }

        // Names resolve without regard to case, so "Laredo" and "LAREDO"
        // would be the same destination.
        if let Some(existing) = self.find_destination(&name).await? {
            return Err(ServiceError::Conflict(format!(
                "destination {} already exists as {}",
                name, existing.name
            )));
        }

        let db = &*self.db;

        let model = destination::ActiveModel {
            name: Set(name),
            address: Set(input.address_lines.join("\n")),
            client_code: Set(input.client_code),
            client_name: Set(input.client_name),
            sales_person: Set(input.sales_person),
            ..Default::default()
        }
        .insert(db)
        .await?;

        info!(destination_id = model.id, "destination created");
        Ok(model)
    }

    pub async fn list_destinations(&self) -> Result<Vec<destination::Model>, ServiceError> {
        Ok(destination::Entity::find()
            .order_by_asc(destination::Column::Name)
            .all(&*self.db)
            .await?)
    }

    /// Case-insensitive lookup by name.
    pub async fn find_destination(
        &self,
        name: &str,
    ) -> Result<Option<destination::Model>, ServiceError> {
        let wanted = name.trim();
        Ok(self
            .list_destinations()
            .await?
            .into_iter()
            .find(|d| d.name.eq_ignore_ascii_case(wanted)))
    }

    /// Inserts or replaces the PO info for a customer lot.
    #[instrument(skip(self, input), fields(customer_lot = %input.customer_lot))]
    pub async fn upsert_purchase_order(
        &self,
        input: PurchaseOrderInfo,
    ) -> Result<purchase_order::Model, ServiceError> {
        let customer_lot = input.customer_lot.trim().to_string();
        if customer_lot.is_empty() {
            return Err(ServiceError::ValidationError(
                "customer lot is required".to_string(),
            ));
        }
        if input.price_per_thousand.is_sign_negative() {
            return Err(ServiceError::ValidationError(
                "price per thousand must not be negative".to_string(),
            ));
        }

        let db = &*self.db;
        let model = purchase_order::ActiveModel {
            customer_lot: Set(customer_lot.clone()),
            sales_order_number: Set(input.sales_order_number),
            price_per_thousand: Set(input.price_per_thousand),
            pieces_per_pallet: Set(input.pieces_per_pallet),
            piezas_por_paquete: Set(input.pieces_per_package),
            customer_item_code: Set(input.customer_item_code),
            created_at: Set(Utc::now()),
        };

        purchase_order::Entity::insert(model)
            .on_conflict(
                OnConflict::column(purchase_order::Column::CustomerLot)
                    .update_columns([
                        purchase_order::Column::SalesOrderNumber,
                        purchase_order::Column::PricePerThousand,
                        purchase_order::Column::PiecesPerPallet,
                        purchase_order::Column::PiezasPorPaquete,
                        purchase_order::Column::CustomerItemCode,
                    ])
                    .to_owned(),
            )
            .exec(db)
            .await?;

        purchase_order::Entity::find_by_id(customer_lot.clone())
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("purchase order {}", customer_lot)))
    }

    pub async fn list_purchase_orders(&self) -> Result<Vec<purchase_order::Model>, ServiceError> {
        Ok(purchase_order::Entity::find()
            .order_by_asc(purchase_order::Column::CustomerLot)
            .all(&*self.db)
            .await?)
    }

    /// PO rows for the given customer lots.
    pub async fn purchase_orders_for(
        &self,
        customer_lots: Vec<String>,
    ) -> Result<Vec<purchase_order::Model>, ServiceError> {
        if customer_lots.is_empty() {
            return Ok(Vec::new());
        }
        Ok(purchase_order::Entity::find()
            .filter(purchase_order::Column::CustomerLot.is_in(customer_lots))
            .all(&*self.db)
            .await?)
    }
}
