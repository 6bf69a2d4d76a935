mod common;

use assert_matches::assert_matches;
use axum::http::{Method, StatusCode};
use bfx_portal::{
    entities::pallet, errors::ServiceError, services::reference_data::NewDestination,
};
use common::{read_json, TestApp};
use sea_orm::EntityTrait;
use serde_json::json;

async fn reload(app: &TestApp, id: uuid::Uuid) -> pallet::Model {
    pallet::Entity::find_by_id(id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap()
}

#[tokio::test]
async fn bulk_update_applies_good_rows_and_reports_bad_ones() {
    let app = TestApp::new().await;
    let first = app.seed_pallet("PT-1", "BOLSA 25KG", 50, None).await;
    let second = app.seed_pallet("PT-2", "ROLLO 40CM", 30, Some("PO-2")).await;

    let csv = format!(
        "id,quantity,customer_lot,notes\n\
         {},45,PO-1,first\n\
         {},,,\n\
         not-a-uuid,10,,\n\
         {},-3,,\n\
         {},12\n",
        first.id,
        second.id,
        uuid::Uuid::new_v4(),
        second.id
    );
    let report = app
        .state
        .services
        .pallets
        .bulk_update_from_csv(&csv)
        .await
        .unwrap();

    assert_eq!(report.updated, 2);
    assert_eq!(report.failed, 3);
    let rows: Vec<usize> = report.errors.iter().map(|e| e.row).collect();
    assert_eq!(rows, vec![4, 5, 6]);

    let first = reload(&app, first.id).await;
    assert_eq!(first.quantity, 45);
    assert_eq!(first.customer_lot.as_deref(), Some("PO-1"));
    let second = reload(&app, second.id).await;
    assert_eq!(second.quantity, 30);
    assert_eq!(second.customer_lot.as_deref(), Some("PO-2"));
}

#[tokio::test]
async fn bulk_update_requires_an_id_column() {
    let app = TestApp::new().await;
    let pallets = &app.state.services.pallets;

    assert_matches!(
        pallets.bulk_update_from_csv("").await,
        Err(ServiceError::ValidationError(_))
    );
    assert_matches!(
        pallets.bulk_update_from_csv("quantity,status\n1,available\n").await,
        Err(ServiceError::ValidationError(_))
    );
}

#[tokio::test]
async fn bulk_update_over_http() {
    let app = TestApp::new().await;
    let pallet = app.seed_pallet("PT-1", "BOLSA 25KG", 50, None).await;

    let response = app
        .request_text(
            Method::POST,
            "/api/v1/pallets/bulk-update",
            &format!("id,status\n{},on_hold\n", pallet.id),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["data"]["updated"], json!(1));
    assert_eq!(reload(&app, pallet.id).await.status, "on_hold");
}

#[tokio::test]
async fn virtual_pallet_is_listed_as_virtual() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/pallets/virtual",
            Some(json!({
                "pt_code": "PT-77",
                "description": "BOLSA 10KG",
                "quantity": 40,
                "unit": "bags",
                "customer_lot": "PO-77"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json(response).await;
    assert_eq!(body["data"]["is_virtual"], json!(true));
    assert_eq!(body["data"]["source"], json!("virtual"));

    let response = app.request(Method::GET, "/api/v1/pallets?status=available", None).await;
    let body = read_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn virtual_pallet_requires_positive_quantity() {
    let app = TestApp::new().await;
    let response = app
        .request(
            Method::POST,
            "/api/v1/pallets/virtual",
            Some(json!({
                "pt_code": "PT-77",
                "description": "BOLSA 10KG",
                "quantity": 0,
                "unit": "bags"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn reference_data_round_trip_over_http() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/destinations",
            Some(json!({
                "name": "LAREDO",
                "address_lines": ["Av. Industrial 100", "Nuevo Laredo"],
                "client_code": "C-1",
                "client_name": "ACME FOODS"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .request(
            Method::PUT,
            "/api/v1/purchase-orders",
            Some(json!({
                "customer_lot": "PO-1",
                "price_per_thousand": "1820.5",
                "pieces_per_pallet": 50000
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request(
            Method::PUT,
            "/api/v1/purchase-orders",
            Some(json!({
                "customer_lot": "PO-1",
                "price_per_thousand": "1900",
                "sales_order_number": "SO-9"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(app.request(Method::GET, "/api/v1/purchase-orders", None).await).await;
    let orders = body["data"].as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["sales_order_number"], json!("SO-9"));

    let body = read_json(app.request(Method::GET, "/api/v1/destinations", None).await).await;
    assert_eq!(body["data"][0]["address_lines"][1], json!("Nuevo Laredo"));
}

#[tokio::test]
async fn destination_names_differing_only_in_case_conflict() {
    let app = TestApp::new().await;
    app.seed_destination("LAREDO").await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/destinations",
            Some(json!({
                "name": "Laredo",
                "address_lines": ["Calle 5"],
                "client_code": "C-2",
                "client_name": "OTHER FOODS"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let reference = &app.state.services.reference;
    assert_matches!(
        reference
            .create_destination(NewDestination {
                name: " laredo ".to_string(),
                address_lines: vec![],
                client_code: "C-3".to_string(),
                client_name: "THIRD".to_string(),
                sales_person: None,
            })
            .await,
        Err(ServiceError::Conflict(_))
    );
    assert_eq!(reference.list_destinations().await.unwrap().len(), 1);
    let found = reference.find_destination("Laredo").await.unwrap().unwrap();
    assert_eq!(found.name, "LAREDO");
}

#[tokio::test]
async fn purchase_order_extraction_without_service_warns() {
    let app = TestApp::new().await;
    let response = app
        .request(
            Method::POST,
            "/api/v1/purchase-orders/extract",
            Some(json!({ "pdf_base64": "JVBERi0=" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert!(body["data"]["extracted"].is_null());
    assert!(body["data"]["warning"].is_string());
}
