use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Assignment of a pallet to a shipping load, carrying the release state.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "load_pallets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub load_id: Uuid,
    pub pallet_id: Uuid,
    pub quantity: i64,
    pub destination: Option<String>,
    pub release_number: Option<String>,
    pub release_pdf_url: Option<String>,
    pub is_on_hold: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::load::Entity",
        from = "Column::LoadId",
        to = "super::load::Column::Id"
    )]
    Load,
    #[sea_orm(
        belongs_to = "super::pallet::Entity",
        from = "Column::PalletId",
        to = "super::pallet::Column::Id"
    )]
    Pallet,
}

impl Related<super::load::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Load.def()
    }
}

impl Related<super::pallet::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Pallet.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
