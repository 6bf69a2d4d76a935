use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Purchase order reference data, keyed by the customer's PO number
/// (the `customer_lot` carried on pallets).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "purchase_orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub customer_lot: String,
    pub sales_order_number: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub price_per_thousand: Decimal,
    pub pieces_per_pallet: Option<i64>,
    pub piezas_por_paquete: Option<i64>,
    /// Customer's own item code, printed on packing lists
    pub customer_item_code: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
