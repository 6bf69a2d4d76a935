//! Pallet maintenance: placeholder pallets and spreadsheet bulk edits.

use std::sync::Arc;

use chrono::Utc;
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};
use serde::Serialize;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entities::pallet::{self, PalletSource},
    errors::ServiceError,
};

const UPDATABLE_COLUMNS: [&str; 5] = ["status", "customer_lot", "bfx_order", "description", "quantity"];

#[derive(Debug, Clone)]
pub struct NewVirtualPallet {
    pub pt_code: String,
    pub description: String,
    pub quantity: i64,
    pub unit: String,
    pub customer_lot: Option<String>,
    pub bfx_order: Option<String>,
    pub gross_weight: Option<Decimal>,
    pub net_weight: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct BulkUpdateError {
    /// Line number in the uploaded file, header is line 1
    pub row: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct BulkUpdateReport {
    pub updated: usize,
    pub failed: usize,
    pub errors: Vec<BulkUpdateError>,
}

impl BulkUpdateReport {
    fn fail(&mut self, row: usize, reason: impl Into<String>) {
        self.failed += 1;
        self.errors.push(BulkUpdateError {
            row,
            reason: reason.into(),
        });
    }
}

#[derive(Clone)]
pub struct PalletService {
    db: Arc<DatabaseConnection>,
}

impl PalletService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn list_pallets(&self, status: Option<&str>) -> Result<Vec<pallet::Model>, ServiceError> {
        let mut query = pallet::Entity::find();
        if let Some(status) = status {
            query = query.filter(pallet::Column::Status.eq(status));
        }
        Ok(query
            .order_by_asc(pallet::Column::PtCode)
            .order_by_asc(pallet::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    /// Inserts a placeholder for product that SAP does not report yet.
    #[instrument(skip(self, input), fields(pt_code = %input.pt_code))]
    pub async fn create_virtual_pallet(
        &self,
        input: NewVirtualPallet,
    ) -> Result<pallet::Model, ServiceError> {
        if input.pt_code.trim().is_empty() || input.description.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "pt code and description are required".to_string(),
            ));
        }
        if input.quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "quantity must be positive".to_string(),
            ));
        }

        let now = Utc::now();
        let model = pallet::ActiveModel {
            id: Set(Uuid::new_v4()),
            pt_code: Set(input.pt_code.trim().to_string()),
            description: Set(input.description.trim().to_string()),
            quantity: Set(input.quantity),
            gross_weight: Set(input.gross_weight),
            net_weight: Set(input.net_weight),
            unit: Set(input.unit),
            customer_lot: Set(non_empty(input.customer_lot)),
            bfx_order: Set(non_empty(input.bfx_order)),
            traceability: Set(None),
            status: Set(pallet::STATUS_AVAILABLE.to_string()),
            source: Set(PalletSource::Virtual.to_string()),
            is_virtual: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;

        counter!("bfx_portal.pallets.virtual_created", 1);
        info!(pallet_id = %model.id, "virtual pallet created");
        Ok(model)
    }

    /// Applies a CSV of pallet edits. The header must name an `id` column;
    /// each data row is applied on its own and failures are collected.
    #[instrument(skip(self, text), fields(bytes = text.len()))]
    pub async fn bulk_update_from_csv(&self, text: &str) -> Result<BulkUpdateReport, ServiceError> {
        let mut records = parse_csv(text).into_iter();
        let header = match records.next() {
            Some(CsvRecord { fields: Ok(fields), .. }) => fields,
            Some(CsvRecord { fields: Err(reason), .. }) => {
                return Err(ServiceError::ValidationError(format!(
                    "unreadable header: {}",
                    reason
                )))
            }
            None => return Err(ServiceError::ValidationError("file is empty".to_string())),
        };

        let columns: Vec<String> = header.iter().map(|h| h.trim().to_lowercase()).collect();
        let id_idx = columns
            .iter()
            .position(|c| c == "id")
            .ok_or_else(|| ServiceError::ValidationError("missing id column".to_string()))?;
        for column in &columns {
            if column != "id" && !UPDATABLE_COLUMNS.contains(&column.as_str()) {
                warn!(column = %column, "ignoring unknown column");
            }
        }

        let mut report = BulkUpdateReport::default();
        for record in records {
            let fields = match record.fields {
                Ok(fields) => fields,
                Err(reason) => {
                    report.fail(record.line, reason);
                    continue;
                }
            };
            if fields.len() != columns.len() {
                report.fail(
                    record.line,
                    format!("expected {} columns, found {}", columns.len(), fields.len()),
                );
                continue;
            }

            match self.apply_row(&columns, id_idx, &fields).await {
                Ok(()) => report.updated += 1,
                Err(reason) => report.fail(record.line, reason),
            }
        }

        counter!("bfx_portal.pallets.bulk_updated", report.updated as u64);
        counter!("bfx_portal.pallets.bulk_failed", report.failed as u64);
        info!(updated = report.updated, failed = report.failed, "bulk pallet update finished");
        Ok(report)
    }

    async fn apply_row(&self, columns: &[String], id_idx: usize, fields: &[String]) -> Result<(), String> {
        let id = Uuid::parse_str(fields[id_idx].trim())
            .map_err(|_| format!("invalid id: {}", fields[id_idx].trim()))?;

        let existing = pallet::Entity::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(|e| e.to_string())?
            .ok_or_else(|| format!("pallet {} not found", id))?;

        let mut active = existing.into_active_model();
        for (column, raw) in columns.iter().zip(fields) {
            let value = raw.trim();
            if value.is_empty() {
                continue;
            }
            match column.as_str() {
                "status" => active.status = Set(value.to_lowercase()),
                "customer_lot" => active.customer_lot = Set(Some(value.to_string())),
                "bfx_order" => active.bfx_order = Set(Some(value.to_string())),
                "description" => active.description = Set(value.to_string()),
                "quantity" => {
                    let quantity: i64 = value
                        .parse()
                        .map_err(|_| format!("quantity is not a whole number: {}", value))?;
                    if quantity < 0 {
                        return Err(format!("quantity must not be negative: {}", quantity));
                    }
                    active.quantity = Set(quantity);
                }
                _ => {}
            }
        }
        active.updated_at = Set(Utc::now());
        active.update(&*self.db).await.map_err(|e| e.to_string())?;
        Ok(())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CsvRecord {
    /// Line the record starts on
    line: usize,
    fields: Result<Vec<String>, String>,
}

/// Comma separated records. Quoted fields may contain commas, newlines and
/// `""` escapes. Blank lines are skipped.
fn parse_csv(text: &str) -> Vec<CsvRecord> {
    let mut records = Vec::new();
    let mut chars = text.trim_start_matches('\u{feff}').chars().peekable();

    let mut line = 1;
    let mut record_line = 1;
    let mut fields: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut quoted = false;
    let mut error: Option<String> = None;

    let finish = |fields: &mut Vec<String>, field: &mut String, quoted: bool, error: &mut Option<String>, start: usize, records: &mut Vec<CsvRecord>| {
        let blank = fields.is_empty() && field.trim().is_empty() && !quoted;
        fields.push(std::mem::take(field));
        let taken = std::mem::take(fields);
        match error.take() {
            Some(reason) => records.push(CsvRecord { line: start, fields: Err(reason) }),
            None if blank => {}
            None => records.push(CsvRecord { line: start, fields: Ok(taken) }),
        }
    };

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push('\n');
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            ',' => {
                fields.push(std::mem::take(&mut field));
                quoted = false;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                finish(&mut fields, &mut field, quoted, &mut error, record_line, &mut records);
                quoted = false;
                line += 1;
                record_line = line;
            }
            '"' if field.trim().is_empty() && !quoted => {
                field.clear();
                in_quotes = true;
                quoted = true;
            }
            '"' => {
                error.get_or_insert_with(|| "unexpected quote in unquoted field".to_string());
            }
            _ if quoted && !c.is_whitespace() => {
                error.get_or_insert_with(|| "text after closing quote".to_string());
            }
            _ if quoted => {}
            _ => field.push(c),
        }
    }

    if in_quotes {
        error = Some("unterminated quoted field".to_string());
    }
    if in_quotes || !fields.is_empty() || !field.is_empty() || quoted || error.is_some() {
        finish(&mut fields, &mut field, quoted, &mut error, record_line, &mut records);
    }
    records
}
