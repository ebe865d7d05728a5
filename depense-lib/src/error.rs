use actix_web::body::BoxBody;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use depense_repo::attachment_store::AttachmentStoreError;
use depense_repo::depense_repo::DepenseRepoError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::depense::validation::ValidationErrors;

#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("Invalid fields: {0}")]
    Validation(ValidationErrors),
    #[error("{error}: {detail}")]
    MalformedPayload { error: &'static str, detail: String },
    #[error("Payload larger than {0} bytes")]
    PayloadTooLarge(usize),
    #[error("Not found")]
    NotFound,
    #[error(transparent)]
    Repo(#[from] DepenseRepoError),
    #[error(transparent)]
    Store(#[from] AttachmentStoreError),
}

impl HandlerError {
    fn detail(&self) -> String {
        match self {
            HandlerError::Repo(DepenseRepoError::Other(e)) => format!("{:#}", e),
            HandlerError::Store(AttachmentStoreError::Other(e)) => format!("{:#}", e),
            _ => self.to_string(),
        }
    }
}

impl From<ValidationErrors> for HandlerError {
    fn from(errors: ValidationErrors) -> Self {
        HandlerError::Validation(errors)
    }
}

impl ResponseError for HandlerError {
    fn status_code(&self) -> StatusCode {
        match self {
            HandlerError::Validation(_) | HandlerError::MalformedPayload { .. } => {
                StatusCode::BAD_REQUEST
            }
            HandlerError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            HandlerError::NotFound | HandlerError::Repo(DepenseRepoError::DepenseNotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse<BoxBody> {
        let status = self.status_code();
        match self {
            HandlerError::Validation(errors) => HttpResponse::build(status).json(errors),
            HandlerError::MalformedPayload { error, detail } => {
                HttpResponse::build(status).json(json!({
                    "error": error,
                    "detail": detail,
                }))
            }
            HandlerError::PayloadTooLarge(_) => {
                HttpResponse::build(status).json(json!({ "detail": self.to_string() }))
            }
            _ if status == StatusCode::NOT_FOUND => {
                HttpResponse::build(status).json(json!({ "detail": "Not found." }))
            }
            _ => {
                let detail = self.detail();
                error!(%detail, "Unexpected failure");
                HttpResponse::build(status).json(json!({ "detail": detail }))
            }
        }
    }
}
