//! API error type and its HTTP mapping.

use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, ResponseError, error::JsonPayloadError};
use building_optimizer_database::DbError;
use building_optimizer_osm::OsmError;
use building_optimizer_server_models::ApiErrorBody;
use thiserror::Error;

/// Errors surfaced by handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request was malformed or missing a required field.
    #[error("{0}")]
    BadRequest(String),

    /// A named resource does not exist.
    #[error("{0}")]
    NotFound(String),

    /// An upstream service failed or returned something unusable.
    #[error("{0}")]
    Upstream(String),

    /// Anything else.
    #[error("{0}")]
    Internal(String),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ApiErrorBody::new(self.to_string()))
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        log::error!("Store failure: {e}");
        Self::Internal(e.to_string())
    }
}

impl From<OsmError> for ApiError {
    fn from(e: OsmError) -> Self {
        match e {
            OsmError::NotFound { query } => Self::NotFound(format!("Nothing found for '{query}'")),
            OsmError::Http(_)
            | OsmError::Network { .. }
            | OsmError::Parse { .. }
            | OsmError::Status { .. } => Self::Upstream(e.to_string()),
        }
    }
}

/// Turns body deserialization failures into `400` error envelopes.
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    log::debug!("Rejected request body: {err}");
    ApiError::BadRequest(format!("Invalid JSON body: {err}")).into()
}
