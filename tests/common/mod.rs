#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use bfx_portal::{
    config::AppConfig,
    db,
    entities::{load, pallet},
    events::{self, EventSender},
    handlers::AppServices,
    services::{
        document_extraction::{
            DisabledExtractor, DocumentExtractor, ExpectedProduct, ExtractionOutcome, PdfSource,
            PurchaseOrderExtraction, ReleaseValidationReport,
        },
        reference_data::{NewDestination, PurchaseOrderInfo},
    },
    storage::{LocalObjectStore, ObjectStore},
    AppState,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::Value;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

pub const FILES_URL: &str = "http://files.test";

/// Knobs for the external collaborators of a test app
#[derive(Default)]
pub struct TestOptions {
    pub sap_url: Option<String>,
    pub extractor: Option<Arc<dyn DocumentExtractor>>,
}

/// Application state backed by an in-memory SQLite database and a
/// temporary upload directory.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub storage_dir: TempDir,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_options(TestOptions::default()).await
    }

    pub async fn with_options(options: TestOptions) -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        // One shared connection keeps the in-memory database alive
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        if let Some(url) = options.sap_url {
            cfg.sap.inventory_url = url;
            cfg.sap.timeout_secs = 5;
            cfg.sap.batch_size = 2;
        }

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let storage_dir = tempfile::tempdir().expect("temp storage dir");
        let store: Arc<dyn ObjectStore> =
            Arc::new(LocalObjectStore::new(storage_dir.path(), FILES_URL));
        let extractor = options
            .extractor
            .unwrap_or_else(|| Arc::new(DisabledExtractor));

        let db_arc = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let services = AppServices::with_backends(
            db_arc.clone(),
            &cfg,
            Some(event_sender.clone()),
            store,
            extractor,
        )
        .expect("services for tests");

        let state = AppState {
            db: db_arc,
            config: cfg,
            event_sender: Some(event_sender),
            services,
        };
        let router = bfx_portal::app_router(state.clone());

        Self {
            router,
            state,
            storage_dir,
            _event_task: event_task,
        }
    }

    /// Send a request against the router with an optional JSON body.
    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Send a plain text body, as uploaded CSV files arrive.
    pub async fn request_text(&self, method: Method, uri: &str, text: &str) -> Response {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "text/csv")
            .body(Body::from(text.to_string()))
            .expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    pub async fn seed_load(&self, load_number: &str) -> load::Model {
        self.state
            .services
            .loads
            .create_load(load_number, Some("F-1001".to_string()))
            .await
            .expect("seed load")
    }

    pub async fn seed_destination(&self, name: &str) {
        self.state
            .services
            .reference
            .create_destination(NewDestination {
                name: name.to_string(),
                address_lines: vec!["Av. Industrial 100".into(), "Nuevo Laredo, TAMPS".into()],
                client_code: "C-1001".to_string(),
                client_name: "ACME FOODS".to_string(),
                sales_person: Some("J. Pérez".to_string()),
            })
            .await
            .expect("seed destination");
    }

    pub async fn seed_purchase_order(&self, customer_lot: &str, price: Decimal) {
        self.state
            .services
            .reference
            .upsert_purchase_order(PurchaseOrderInfo {
                customer_lot: customer_lot.to_string(),
                sales_order_number: Some(format!("SO-{}", customer_lot)),
                price_per_thousand: price,
                pieces_per_pallet: Some(50_000),
                pieces_per_package: Some(1_000),
                customer_item_code: Some(format!("ITEM-{}", customer_lot)),
            })
            .await
            .expect("seed purchase order");
    }

    pub async fn seed_pallet(
        &self,
        pt_code: &str,
        description: &str,
        quantity: i64,
        customer_lot: Option<&str>,
    ) -> pallet::Model {
        let now = Utc::now();
        pallet::ActiveModel {
            id: Set(Uuid::new_v4()),
            pt_code: Set(pt_code.to_string()),
            description: Set(description.to_string()),
            quantity: Set(quantity),
            gross_weight: Set(Some(Decimal::new(520, 0))),
            net_weight: Set(Some(Decimal::new(500, 0))),
            unit: Set("bags".to_string()),
            customer_lot: Set(customer_lot.map(str::to_string)),
            bfx_order: Set(None),
            traceability: Set(Some(format!("TR-{}", Uuid::new_v4().simple()))),
            status: Set(pallet::STATUS_AVAILABLE.to_string()),
            source: Set(pallet::PalletSource::Sap.to_string()),
            is_virtual: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed pallet")
    }

    /// Seeds a pallet and assigns it to the load, returning the assignment id.
    pub async fn seed_assignment(
        &self,
        load_id: Uuid,
        pt_code: &str,
        quantity: i64,
        customer_lot: Option<&str>,
        destination: Option<&str>,
    ) -> Uuid {
        let pallet = self
            .seed_pallet(pt_code, &format!("PRODUCT {}", pt_code), quantity, customer_lot)
            .await;
        self.state
            .services
            .loads
            .assign_pallet(load_id, pallet.id, None, destination.map(str::to_string))
            .await
            .expect("seed assignment")
            .id
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

pub async fn read_json(response: Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&body).expect("response body is JSON")
}

pub async fn read_bytes(response: Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body")
        .to_vec()
}

/// Extractor double returning a fixed release report
pub struct StaticExtractor {
    pub release: ExtractionOutcome<ReleaseValidationReport>,
}

#[async_trait]
impl DocumentExtractor for StaticExtractor {
    async fn validate_release(
        &self,
        _pdf: &PdfSource,
        _expected_products: &[ExpectedProduct],
    ) -> ExtractionOutcome<ReleaseValidationReport> {
        self.release.clone()
    }

    async fn extract_purchase_order(
        &self,
        _pdf: &PdfSource,
    ) -> ExtractionOutcome<PurchaseOrderExtraction> {
        ExtractionOutcome::failure("not used")
    }
}
