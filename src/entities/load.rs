use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "loads")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub load_number: String,
    pub invoice_number: Option<String>,
    pub status: String,
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

pub const STATUS_OPEN: &str = "open";
