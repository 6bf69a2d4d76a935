pub mod common;
pub mod inventory;
pub mod loads;
pub mod pallets;
pub mod reference;

use std::sync::Arc;

use crate::{
    config::AppConfig,
    errors::ServiceError,
    events::EventSender,
    services::{
        document_extraction::{extractor_from_config, DocumentExtractor},
        documents::DocumentService,
        inventory_sync::InventorySyncService,
        loads::LoadService,
        pallets::PalletService,
        reference_data::ReferenceDataService,
        release::ReleaseService,
    },
    storage::{LocalObjectStore, ObjectStore},
};
use sea_orm::DatabaseConnection;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub loads: Arc<LoadService>,
    pub releases: Arc<ReleaseService>,
    pub documents: Arc<DocumentService>,
    pub inventory_sync: Arc<InventorySyncService>,
    pub pallets: Arc<PalletService>,
    pub reference: Arc<ReferenceDataService>,
    pub extractor: Arc<dyn DocumentExtractor>,
}

impl AppServices {
    /// Builds the services from configuration, storing uploads on local disk.
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: &AppConfig,
        event_sender: Option<EventSender>,
    ) -> Result<Self, ServiceError> {
        let store: Arc<dyn ObjectStore> = Arc::new(LocalObjectStore::from_config(&config.storage));
        let extractor = extractor_from_config(&config.extraction)?;
        Self::with_backends(db, config, event_sender, store, extractor)
    }

    /// Same as [`AppServices::new`] with the storage and extraction backends supplied.
    pub fn with_backends(
        db: Arc<DatabaseConnection>,
        config: &AppConfig,
        event_sender: Option<EventSender>,
        store: Arc<dyn ObjectStore>,
        extractor: Arc<dyn DocumentExtractor>,
    ) -> Result<Self, ServiceError> {
        let inventory_sync = InventorySyncService::new(
            db.clone(),
            config.sap.clone(),
            event_sender.clone(),
        )?;

        Ok(Self {
            loads: Arc::new(LoadService::new(db.clone())),
            releases: Arc::new(ReleaseService::new(
                db.clone(),
                store,
                extractor.clone(),
                event_sender,
            )),
            documents: Arc::new(DocumentService::new(db.clone(), config.documents.clone())),
            inventory_sync: Arc::new(inventory_sync),
            pallets: Arc::new(PalletService::new(db.clone())),
            reference: Arc::new(ReferenceDataService::new(db)),
            extractor,
        })
    }
}
