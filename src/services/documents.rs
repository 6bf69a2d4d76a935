use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use metrics::counter;
use sea_orm::DatabaseConnection;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::{
    config::DocumentsConfig,
    documents::{
        customs::{CustomsPallet, PoPricing},
        packing_list::{
            resolve_customer_po, PackingListHeader, PackingPallet, PackingPoInfo, ShipTo,
        },
        build_customs_document, build_packing_list, render_customs_workbook,
        render_packing_list_pdf, PDF_CONTENT_TYPE, XLSX_CONTENT_TYPE,
    },
    entities::purchase_order,
    errors::ServiceError,
    services::{loads::LoadService, reference_data::ReferenceDataService},
};

/// A rendered file ready to be downloaded
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedDocument {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

#[derive(Clone)]
pub struct DocumentService {
    loads: LoadService,
    reference: ReferenceDataService,
    config: DocumentsConfig,
}

impl DocumentService {
    pub fn new(db: Arc<DatabaseConnection>, config: DocumentsConfig) -> Self {
        Self {
            loads: LoadService::new(db.clone()),
            reference: ReferenceDataService::new(db),
            config,
        }
    }

    async fn purchase_orders(
        &self,
        lots: impl Iterator<Item = String>,
    ) -> Result<Vec<purchase_order::Model>, ServiceError> {
        let mut lots: Vec<String> = lots.collect();
        lots.sort();
        lots.dedup();
        self.reference.purchase_orders_for(lots).await
    }

    /// Customs workbook for every pallet on the load.
    #[instrument(skip(self))]
    pub async fn customs_document(
        &self,
        load_id: Uuid,
        date: NaiveDate,
    ) -> Result<GeneratedDocument, ServiceError> {
        let detail = self.loads.load_detail(load_id).await?;
        let orders = self
            .purchase_orders(detail.lines.iter().filter_map(|l| l.customer_lot.clone()))
            .await?;
        let pricing: HashMap<String, PoPricing> = orders
            .into_iter()
            .map(|po| {
                (
                    po.customer_lot,
                    PoPricing {
                        sales_order_number: po.sales_order_number,
                        price_per_thousand: po.price_per_thousand,
                        pieces_per_pallet: po.pieces_per_pallet,
                        pieces_per_package: po.piezas_por_paquete,
                    },
                )
            })
            .collect();

        let pallets: Vec<CustomsPallet> = detail
            .lines
            .into_iter()
            .map(|line| CustomsPallet {
                pt_code: line.pt_code,
                description: line.description,
                destination: line.destination,
                quantity: line.quantity,
                gross_weight: line.gross_weight,
                net_weight: line.net_weight,
                unit: line.unit,
                customer_lot: line.customer_lot,
            })
            .collect();

        let document = build_customs_document(&detail.load_number, date, &pallets, &pricing);
        let bytes = render_customs_workbook(&document, &self.config.company_name).map_err(|e| {
            error!(%load_id, "customs workbook rendering failed: {}", e);
            ServiceError::from(e)
        })?;

        counter!("bfx_portal.documents.customs_generated", 1);
        info!(
            %load_id,
            products = document.products.len(),
            pallets = document.totals.pallets,
            "customs document generated"
        );
        Ok(GeneratedDocument {
            filename: document.filename(),
            content_type: XLSX_CONTENT_TYPE,
            bytes,
        })
    }

    /// Packing list PDF for the pallets going to one destination.
    #[instrument(skip(self))]
    pub async fn packing_list(
        &self,
        load_id: Uuid,
        destination: &str,
        date: NaiveDate,
    ) -> Result<GeneratedDocument, ServiceError> {
        let detail = self.loads.load_detail(load_id).await?;
        let ship_to = self
            .reference
            .find_destination(destination)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("destination {} not found", destination.trim()))
            })?;

        let pallets: Vec<PackingPallet> = detail
            .lines
            .into_iter()
            .filter(|line| {
                line.destination
                    .as_deref()
                    .is_some_and(|d| d.trim().eq_ignore_ascii_case(&ship_to.name))
            })
            .map(|line| PackingPallet {
                customer_lot: line.customer_lot,
                bfx_order: line.bfx_order,
                description: line.description,
                quantity: line.quantity,
                unit: line.unit,
                release_number: line.release_number,
            })
            .collect();
        if pallets.is_empty() {
            return Err(ServiceError::ValidationError(format!(
                "load {} has no pallets for destination {}",
                detail.load_number, ship_to.name
            )));
        }

        let orders = self
            .purchase_orders(pallets.iter().map(resolve_customer_po))
            .await?;
        let po_info: HashMap<String, PackingPoInfo> = orders
            .into_iter()
            .map(|po| {
                (
                    po.customer_lot,
                    PackingPoInfo {
                        sales_order_number: po.sales_order_number,
                        customer_item_code: po.customer_item_code,
                    },
                )
            })
            .collect();

        let header = PackingListHeader {
            company_name: self.config.company_name.clone(),
            revision: self.config.packing_list_revision.clone(),
            load_number: detail.load_number,
            invoice_number: detail.invoice_number,
            date,
            ship_to: ShipTo {
                address_lines: ship_to.address_lines(),
                name: ship_to.name,
                client_code: ship_to.client_code,
                client_name: ship_to.client_name,
                sales_person: ship_to.sales_person,
            },
        };

        let list = build_packing_list(header, &pallets, &po_info, resolve_customer_po);
        let bytes = render_packing_list_pdf(&list).map_err(|e| {
            error!(%load_id, "packing list rendering failed: {}", e);
            ServiceError::from(e)
        })?;

        counter!("bfx_portal.documents.packing_lists_generated", 1);
        info!(
            %load_id,
            lines = list.lines.len(),
            pallets = list.total_pallets,
            "packing list generated"
        );
        Ok(GeneratedDocument {
            filename: list.filename(),
            content_type: PDF_CONTENT_TYPE,
            bytes,
        })
    }
}
