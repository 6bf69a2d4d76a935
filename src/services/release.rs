//! Release grouping: marking a load's pallet assignments as released to a
//! destination, or putting them on hold.

use std::collections::BTreeSet;
use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use metrics::counter;
use sea_orm::{
    sea_query::Expr, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
};
use serde::Serialize;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    documents::PDF_CONTENT_TYPE,
    entities::{load, load_pallet},
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        document_extraction::{
            DocumentExtractor, ExpectedProduct, ExtractionOutcome, PdfSource,
            ReleaseValidationReport,
        },
        loads::LoadService,
        reference_data::ReferenceDataService,
    },
    storage::ObjectStore,
};

#[derive(Debug, Clone)]
pub struct ReleaseRequest {
    pub assignment_ids: Vec<Uuid>,
    pub release_number: String,
    pub destination: String,
    /// Signed release authorization
    pub pdf: Option<Bytes>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ReleaseOutcome {
    pub load_id: Uuid,
    pub release_number: String,
    pub destination: String,
    pub assignments_updated: u64,
    pub release_pdf_url: Option<String>,
}

/// Result of checking a release document. Extraction problems degrade to
/// manual entry instead of failing.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ReleaseValidation {
    Verified { report: ReleaseValidationReport },
    ManualEntry { warning: String },
}

#[derive(Clone)]
pub struct ReleaseService {
    db: Arc<DatabaseConnection>,
    loads: LoadService,
    reference: ReferenceDataService,
    store: Arc<dyn ObjectStore>,
    extractor: Arc<dyn DocumentExtractor>,
    event_sender: Option<EventSender>,
}

impl ReleaseService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        store: Arc<dyn ObjectStore>,
        extractor: Arc<dyn DocumentExtractor>,
        event_sender: Option<EventSender>,
    ) -> Self {
        Self {
            loads: LoadService::new(db.clone()),
            reference: ReferenceDataService::new(db.clone()),
            db,
            store,
            extractor,
            event_sender,
        }
    }

    /// Writes the release number and destination on every selected
    /// assignment and clears their hold flag in one batched update. The
    /// authorization PDF, when given, is uploaded afterwards and its URL
    /// written by a second update.
    #[instrument(skip(self, request), fields(release_number = %request.release_number, pallets = request.assignment_ids.len()))]
    pub async fn release(
        &self,
        load_id: Uuid,
        request: ReleaseRequest,
    ) -> Result<ReleaseOutcome, ServiceError> {
        let release_number = request.release_number.trim().to_string();
        if release_number.is_empty() {
            return Err(ServiceError::ValidationError(
                "release number is required".to_string(),
            ));
        }
        if request.destination.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "destination is required".to_string(),
            ));
        }
        let ids = unique_ids(&request.assignment_ids)?;

        let load = self.loads.get_load(load_id).await?;
        let destination = self
            .reference
            .find_destination(&request.destination)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("destination {} not found", request.destination.trim()))
            })?
            .name;
        self.ensure_assignments_belong(load_id, &ids).await?;

        let db = &*self.db;
        let updated = load_pallet::Entity::update_many()
            .col_expr(load_pallet::Column::ReleaseNumber, Expr::value(release_number.clone()))
            .col_expr(load_pallet::Column::Destination, Expr::value(destination.clone()))
            .col_expr(load_pallet::Column::IsOnHold, Expr::value(false))
            .col_expr(load_pallet::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(load_pallet::Column::Id.is_in(ids.clone()))
            .exec(db)
            .await
            .map_err(|e| {
                error!("Failed to release pallets on load {}: {}", load_id, e);
                ServiceError::DatabaseError(e)
            })?
            .rows_affected;

        counter!("bfx_portal.release.pallets_released", updated);
        info!(%load_id, updated, destination = %destination, "pallets released");

        let release_pdf_url = match request.pdf {
            Some(pdf) => Some(
                self.attach_release_pdf(&load, &release_number, &ids, pdf)
                    .await?,
            ),
            None => None,
        };

        if let Some(sender) = &self.event_sender {
            sender
                .send_or_log(Event::PalletsReleased {
                    load_id,
                    assignment_ids: ids,
                    release_number: release_number.clone(),
                    destination: destination.clone(),
                })
                .await;
        }

        Ok(ReleaseOutcome {
            load_id,
            release_number,
            destination,
            assignments_updated: updated,
            release_pdf_url,
        })
    }

    async fn attach_release_pdf(
        &self,
        load: &load::Model,
        release_number: &str,
        ids: &[Uuid],
        pdf: Bytes,
    ) -> Result<String, ServiceError> {
        let path = release_pdf_path(&load.load_number, release_number);
        let stored = self
            .store
            .upload(&path, pdf, PDF_CONTENT_TYPE)
            .await
            .map_err(|e| {
                error!(%path, "release PDF upload failed after pallets were released: {}", e);
                e
            })?;

        load_pallet::Entity::update_many()
            .col_expr(load_pallet::Column::ReleasePdfUrl, Expr::value(stored.url.clone()))
            .col_expr(load_pallet::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(load_pallet::Column::Id.is_in(ids.to_vec()))
            .exec(&*self.db)
            .await?;

        Ok(stored.url)
    }

    /// Flags the selected assignments as on hold. Release fields are left as
    /// they are.
    #[instrument(skip(self, assignment_ids), fields(pallets = assignment_ids.len()))]
    pub async fn put_on_hold(
        &self,
        load_id: Uuid,
        assignment_ids: &[Uuid],
    ) -> Result<u64, ServiceError> {
        let ids = unique_ids(assignment_ids)?;
        self.loads.get_load(load_id).await?;
        self.ensure_assignments_belong(load_id, &ids).await?;

        let updated = load_pallet::Entity::update_many()
            .col_expr(load_pallet::Column::IsOnHold, Expr::value(true))
            .col_expr(load_pallet::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(load_pallet::Column::Id.is_in(ids.clone()))
            .exec(&*self.db)
            .await
            .map_err(|e| {
                error!("Failed to put pallets on hold on load {}: {}", load_id, e);
                ServiceError::DatabaseError(e)
            })?
            .rows_affected;

        counter!("bfx_portal.release.pallets_held", updated);
        info!(%load_id, updated, "pallets put on hold");

        if let Some(sender) = &self.event_sender {
            sender
                .send_or_log(Event::PalletsPutOnHold {
                    load_id,
                    assignment_ids: ids,
                })
                .await;
        }
        Ok(updated)
    }

    /// Asks the extraction service to corroborate a release document. Never
    /// fails: any extraction problem comes back as `ManualEntry`.
    #[instrument(skip(self, pdf, expected_products))]
    pub async fn validate_against_document(
        &self,
        pdf: &PdfSource,
        expected_products: &[ExpectedProduct],
    ) -> ReleaseValidation {
        match self.extractor.validate_release(pdf, expected_products).await {
            ExtractionOutcome::Success(report) => {
                counter!("bfx_portal.release.documents_verified", 1);
                ReleaseValidation::Verified { report }
            }
            ExtractionOutcome::Failure { reason } => {
                counter!("bfx_portal.release.manual_entry", 1);
                warn!(%reason, "release document could not be verified");
                ReleaseValidation::ManualEntry {
                    warning: format!(
                        "Document could not be verified automatically ({}). Enter the release number manually.",
                        reason
                    ),
                }
            }
        }
    }

    /// Validates a release document against the products on the selected
    /// assignments.
    pub async fn validate_for_assignments(
        &self,
        load_id: Uuid,
        assignment_ids: &[Uuid],
        pdf: &PdfSource,
    ) -> Result<ReleaseValidation, ServiceError> {
        let ids = unique_ids(assignment_ids)?;
        let lines = self.loads.pallet_lines(load_id).await?;

        let mut expected: Vec<ExpectedProduct> = Vec::new();
        for line in lines.into_iter().filter(|l| ids.contains(&l.assignment_id)) {
            let product = ExpectedProduct {
                pt_code: line.pt_code,
                description: line.description,
                customer_lot: line.customer_lot,
            };
            if !expected.contains(&product) {
                expected.push(product);
            }
        }
        if expected.is_empty() {
            return Err(ServiceError::NotFound(format!(
                "no selected assignments found on load {}",
                load_id
            )));
        }

        Ok(self.validate_against_document(pdf, &expected).await)
    }

    async fn ensure_assignments_belong(
        &self,
        load_id: Uuid,
        ids: &[Uuid],
    ) -> Result<(), ServiceError> {
        let found = load_pallet::Entity::find()
            .filter(load_pallet::Column::LoadId.eq(load_id))
            .filter(load_pallet::Column::Id.is_in(ids.to_vec()))
            .count(&*self.db)
            .await?;
        if found as usize != ids.len() {
            return Err(ServiceError::NotFound(format!(
                "{} of {} assignments not found on load {}",
                ids.len() - found as usize,
                ids.len(),
                load_id
            )));
        }
        Ok(())
    }
}

fn unique_ids(ids: &[Uuid]) -> Result<Vec<Uuid>, ServiceError> {
    if ids.is_empty() {
        return Err(ServiceError::ValidationError(
            "select at least one pallet".to_string(),
        ));
    }
    let mut seen = BTreeSet::new();
    Ok(ids.iter().copied().filter(|id| seen.insert(*id)).collect())
}

/// `releases/<load>/<release>.pdf`, with path separators in either part
/// replaced.
pub fn release_pdf_path(load_number: &str, release_number: &str) -> String {
    let clean = |s: &str| s.trim().replace(['/', '\\'], "-");
    format!(
        "releases/{}/{}.pdf",
        clean(load_number),
        clean(release_number)
    )
}
