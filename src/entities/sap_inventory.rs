use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Working copy of the SAP inventory snapshot. Every row is stamped with the
/// timestamp of the sync run that wrote it.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sap_inventory")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub pt_code: String,
    pub description: String,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub stock: Decimal,
    pub unit: String,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))", nullable)]
    pub gross_weight: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))", nullable)]
    pub net_weight: Option<Decimal>,
    pub traceability: Option<String>,
    pub customer_lot: Option<String>,
    pub boxes: i64,
    pub assigned_delivery: Option<String>,
    pub status: String,
    pub production_date: NaiveDate,
    pub synced_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
