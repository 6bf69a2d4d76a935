use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use utoipa::IntoParams;
use validator::Validate;

use crate::{errors::ServiceError, services::documents::GeneratedDocument};

/// Validate request input
pub fn validate_input<T: Validate>(input: &T) -> Result<(), ServiceError> {
    input.validate().map_err(ServiceError::from)
}

/// Decodes a base64 upload carried in a JSON body
pub fn decode_base64(field: &str, value: &str) -> Result<Bytes, ServiceError> {
    STANDARD
        .decode(value.trim())
        .map(Bytes::from)
        .map_err(|e| ServiceError::ValidationError(format!("{} is not valid base64: {}", field, e)))
}

/// Date printed on a generated document, today when omitted
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DocumentDateQuery {
    /// Document date (YYYY-MM-DD)
    pub date: Option<NaiveDate>,
}

impl DocumentDateQuery {
    pub fn resolve(&self) -> NaiveDate {
        self.date.unwrap_or_else(|| Utc::now().date_naive())
    }
}

/// Binary download with `Content-Disposition: attachment`
pub fn attachment_response(document: GeneratedDocument) -> Result<Response, ServiceError> {
    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        document.filename.replace('"', "")
    ))
    .map_err(|e| ServiceError::InternalError(format!("invalid filename header: {}", e)))?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(document.content_type)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        document.bytes,
    )
        .into_response())
}
