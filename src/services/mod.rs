// Loads and releases
pub mod loads;
pub mod release;

// Shipping documents
pub mod documents;

// SAP inventory and pallets
pub mod inventory_sync;
pub mod pallets;

// Reference data
pub mod reference_data;

// External services
pub mod document_extraction;
