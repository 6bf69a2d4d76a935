mod common;

use assert_matches::assert_matches;
use axum::http::{Method, StatusCode};
use bfx_portal::{
    entities::{pallet, sap_inventory},
    errors::ServiceError,
    services::pallets::NewVirtualPallet,
};
use common::{read_json, TestApp, TestOptions};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde_json::{json, Value};
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

async fn sap_app(server: &MockServer) -> TestApp {
    TestApp::with_options(TestOptions {
        sap_url: Some(format!("{}/api/inventario", server.uri())),
        ..Default::default()
    })
    .await
}

async fn serve_feed(server: &MockServer, body: Value) {
    server.reset().await;
    Mock::given(method("GET"))
        .and(path("/api/inventario"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

fn feed() -> Value {
    json!([
        {
            "claveProducto": "PT-1",
            "nombreProducto": "BOLSA 25KG",
            "totalUnits": "50,000",
            "uom": "MIL",
            "pesoBruto": 520.5,
            "pesoNeto": 500,
            "lote": "LOT-A",
            "po": "PO-1",
            "cajas": 50,
            "fecha": "2026-01-15"
        },
        {
            "claveProducto": "PT-1",
            "nombreProducto": "BOLSA 25KG",
            "cantidad": 12000,
            "lote": "LOT-B",
            "po": "PO-1",
            "cajas": "12",
            "fecha": "15/01/2026"
        },
        {
            "claveProducto": "PT-2",
            "nombreProducto": "ROLLO 40CM",
            "totalUnits": 9000,
            "lote": "LOT-C",
            "cajas": 9,
            "asignadoAentrega": "8001234"
        }
    ])
}

async fn snapshot_count(app: &TestApp) -> u64 {
    sap_inventory::Entity::find()
        .count(&*app.state.db)
        .await
        .unwrap()
}

#[tokio::test]
async fn sync_replaces_snapshot_with_feed() {
    let server = MockServer::start().await;
    serve_feed(&server, feed()).await;
    let app = sap_app(&server).await;
    let service = &app.state.services.inventory_sync;

    let report = service.sync().await.unwrap();
    assert_eq!(report.fetched, 3);
    assert_eq!(report.inserted, 3);
    assert_eq!(report.removed_stale, 0);
    assert_eq!(snapshot_count(&app).await, 3);

    serve_feed(&server, json!([feed()[0].clone()])).await;
    let report = service.sync().await.unwrap();
    assert_eq!(report.fetched, 1);
    assert_eq!(report.removed_stale, 3);

    let rows = service.current_snapshot(None).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows.iter().all(|r| r.synced_at == report.synced_at));
}

#[tokio::test]
async fn sync_normalises_feed_fields() {
    let server = MockServer::start().await;
    serve_feed(&server, feed()).await;
    let app = sap_app(&server).await;
    let service = &app.state.services.inventory_sync;
    service.sync().await.unwrap();

    let available = service.current_snapshot(Some("available")).await.unwrap();
    assert_eq!(available.len(), 2);
    let lot_b = available
        .iter()
        .find(|r| r.traceability.as_deref() == Some("LOT-B"))
        .unwrap();
    assert_eq!(lot_b.unit, "MIL");
    assert_eq!(lot_b.boxes, 12);
    assert_eq!(lot_b.production_date.to_string(), "2026-01-15");

    let assigned = service.current_snapshot(Some("assigned")).await.unwrap();
    assert_eq!(assigned.len(), 1);
    assert_eq!(assigned[0].assigned_delivery.as_deref(), Some("8001234"));
}

#[tokio::test]
async fn failed_fetch_leaves_snapshot_untouched() {
    let server = MockServer::start().await;
    serve_feed(&server, feed()).await;
    let app = sap_app(&server).await;
    let service = &app.state.services.inventory_sync;
    service.sync().await.unwrap();

    server.reset().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    assert_matches!(
        service.sync().await,
        Err(ServiceError::ExternalServiceError(_))
    );
    assert_eq!(snapshot_count(&app).await, 3);

    serve_feed(&server, json!({ "error": "maintenance" })).await;
    assert_matches!(service.sync().await, Err(ServiceError::ExternalApiError(_)));
    assert_eq!(snapshot_count(&app).await, 3);
}

#[tokio::test]
async fn empty_feed_empties_snapshot() {
    let server = MockServer::start().await;
    serve_feed(&server, feed()).await;
    let app = sap_app(&server).await;
    let service = &app.state.services.inventory_sync;
    service.sync().await.unwrap();

    serve_feed(&server, json!([])).await;
    let report = service.sync().await.unwrap();
    assert_eq!(report.fetched, 0);
    assert_eq!(snapshot_count(&app).await, 0);
}

#[tokio::test]
async fn mirror_creates_pallets_and_supersedes_virtual_ones() {
    let server = MockServer::start().await;
    serve_feed(&server, feed()).await;
    let app = sap_app(&server).await;

    let placeholder = app
        .state
        .services
        .pallets
        .create_virtual_pallet(NewVirtualPallet {
            pt_code: "PT-1".to_string(),
            description: "BOLSA 25KG".to_string(),
            quantity: 50,
            unit: "bags".to_string(),
            customer_lot: Some("PO-1".to_string()),
            bfx_order: None,
            gross_weight: None,
            net_weight: None,
        })
        .await
        .unwrap();

    let report = app.state.services.inventory_sync.sync().await.unwrap();
    let mirror = report.mirror.expect("mirror pass ran");
    assert_eq!(mirror.inserted, 2);
    assert_eq!(mirror.virtual_superseded, 1);
    assert!(report.mirror_error.is_none());

    let db = &*app.state.db;
    assert!(pallet::Entity::find_by_id(placeholder.id)
        .one(db)
        .await
        .unwrap()
        .is_none());
    let sap_pallets = pallet::Entity::find()
        .filter(pallet::Column::Source.eq("sap"))
        .all(db)
        .await
        .unwrap();
    assert_eq!(sap_pallets.len(), 2);
    assert!(sap_pallets.iter().any(|p| p.quantity == 12));

    // A second run does not duplicate lots
    let again = app.state.services.inventory_sync.sync().await.unwrap();
    assert_eq!(again.mirror.unwrap().inserted, 2);
    assert_eq!(
        pallet::Entity::find()
            .filter(pallet::Column::Source.eq("sap"))
            .count(db)
            .await
            .unwrap(),
        2
    );
}

#[tokio::test]
async fn mirror_keeps_pallets_already_on_a_load() {
    let server = MockServer::start().await;
    serve_feed(&server, feed()).await;
    let app = sap_app(&server).await;
    app.state.services.inventory_sync.sync().await.unwrap();

    let db = &*app.state.db;
    let lot_a = pallet::Entity::find()
        .filter(pallet::Column::Traceability.eq("LOT-A"))
        .one(db)
        .await
        .unwrap()
        .unwrap();
    let load = app.seed_load("L-900").await;
    app.state
        .services
        .loads
        .assign_pallet(load.id, lot_a.id, None, None)
        .await
        .unwrap();

    let report = app.state.services.inventory_sync.sync().await.unwrap();
    let mirror = report.mirror.unwrap();
    assert_eq!(mirror.skipped_existing, 1);
    assert_eq!(mirror.inserted, 1);
    assert!(pallet::Entity::find_by_id(lot_a.id)
        .one(db)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn sync_endpoint_reports_bad_gateway_on_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let app = sap_app(&server).await;

    let response = app.request(Method::POST, "/api/v1/inventory/sync", None).await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn inventory_endpoint_lists_snapshot() {
    let server = MockServer::start().await;
    serve_feed(&server, feed()).await;
    let app = sap_app(&server).await;

    let response = app.request(Method::POST, "/api/v1/inventory/sync", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["data"]["fetched"], json!(3));

    let response = app
        .request(Method::GET, "/api/v1/inventory?status=assigned", None)
        .await;
    let body = read_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["pt_code"], json!("PT-2"));
}
