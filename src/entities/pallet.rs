use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// A physical (or placeholder) pallet that can be assigned to a shipping load.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pallets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub pt_code: String,
    pub description: String,
    /// Package count on the pallet (boxes for bags, rolls otherwise)
    pub quantity: i64,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))", nullable)]
    pub gross_weight: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))", nullable)]
    pub net_weight: Option<Decimal>,
    pub unit: String,
    pub customer_lot: Option<String>,
    pub bfx_order: Option<String>,
    pub traceability: Option<String>,
    pub status: String,
    pub source: String,
    pub is_virtual: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::load_pallet::Entity")]
    LoadPallets,
}

impl Related<super::load_pallet::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LoadPallets.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Where a pallet row came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum PalletSource {
    Sap,
    Virtual,
}

pub const STATUS_AVAILABLE: &str = "available";
