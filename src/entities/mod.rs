//! Database entities for the portal tables.

pub mod destination;
pub mod load;
pub mod load_pallet;
pub mod pallet;
pub mod purchase_order;
pub mod sap_inventory;
