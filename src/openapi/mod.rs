use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "BFX Packaging Portal API",
        version = "1.0.0",
        description = r#"
# BFX Packaging Portal API

Backend for the packaging customer portal.

## Features

- **Loads**: Shipping loads and the pallets assigned to them
- **Releases**: Release groups of pallets to a destination, or hold them
- **Documents**: Customs workbook (xlsx) and per-destination packing list (PDF)
- **Inventory**: SAP inventory snapshot and pallet mirror
- **Reference data**: Destinations and purchase order pricing

## Error Handling

Errors use one JSON shape with the matching HTTP status code:

```json
{
  "error": "Not Found",
  "message": "Not found: load 3f2c... not found",
  "request_id": "req-abc123xyz",
  "timestamp": "2026-03-09T10:30:00.000Z"
}
```
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "loads", description = "Shipping load endpoints"),
        (name = "releases", description = "Release and hold endpoints"),
        (name = "documents", description = "Generated shipping documents"),
        (name = "inventory", description = "SAP inventory snapshot endpoints"),
        (name = "pallets", description = "Pallet maintenance endpoints"),
        (name = "reference", description = "Destinations and purchase orders")
    ),
    paths(
        // Loads
        crate::handlers::loads::create_load,
        crate::handlers::loads::list_loads,
        crate::handlers::loads::get_load,
        crate::handlers::loads::assign_pallet,
        // Releases
        crate::handlers::loads::release_pallets,
        crate::handlers::loads::hold_pallets,
        crate::handlers::loads::validate_release,
        // Documents
        crate::handlers::loads::customs_document,
        crate::handlers::loads::packing_list,
        // Inventory
        crate::handlers::inventory::sync_inventory,
        crate::handlers::inventory::list_inventory,
        // Pallets
        crate::handlers::pallets::list_pallets,
        crate::handlers::pallets::create_virtual_pallet,
        crate::handlers::pallets::bulk_update,
        // Reference data
        crate::handlers::reference::list_destinations,
        crate::handlers::reference::create_destination,
        crate::handlers::reference::list_purchase_orders,
        crate::handlers::reference::upsert_purchase_order,
        crate::handlers::reference::extract_purchase_order,
    ),
    components(
        schemas(
            // Common types
            crate::ApiResponse<serde_json::Value>,
            // Loads
            crate::handlers::loads::CreateLoadRequest,
            crate::handlers::loads::LoadSummary,
            crate::handlers::loads::AssignPalletRequest,
            crate::handlers::loads::AssignmentSummary,
            crate::services::loads::LoadDetail,
            crate::services::loads::PalletLine,
            // Releases
            crate::handlers::loads::ReleasePalletsRequest,
            crate::handlers::loads::HoldPalletsRequest,
            crate::handlers::loads::HoldResponse,
            crate::handlers::loads::ValidateReleaseRequest,
            crate::services::release::ReleaseOutcome,
            crate::services::release::ReleaseValidation,
            crate::services::document_extraction::ReleaseValidationReport,
            crate::services::document_extraction::ExtractedProduct,
            // Inventory
            crate::handlers::inventory::InventoryRow,
            crate::services::inventory_sync::SyncReport,
            crate::services::inventory_sync::MirrorReport,
            // Pallets
            crate::handlers::pallets::PalletSummary,
            crate::handlers::pallets::CreateVirtualPalletRequest,
            crate::services::pallets::BulkUpdateReport,
            crate::services::pallets::BulkUpdateError,
            // Reference data
            crate::handlers::reference::DestinationSummary,
            crate::handlers::reference::CreateDestinationRequest,
            crate::handlers::reference::PurchaseOrderSummary,
            crate::handlers::reference::UpsertPurchaseOrderRequest,
            crate::handlers::reference::ExtractPurchaseOrderRequest,
            crate::handlers::reference::PurchaseOrderExtractionResponse,
            crate::services::document_extraction::PurchaseOrderExtraction,
            // Error types
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
