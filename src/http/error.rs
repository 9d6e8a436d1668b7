//! Error responses.
//!
//! Every failure leaves the adapter as `{ "error", "message", "stage",
//! "blob_address", "tx_ref" }` JSON. The last three are null when unknown.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::orchestrator::{ErrorKind, LifecycleError, SessionError, Stage};

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    pub stage: Option<Stage>,
    pub blob_address: Option<String>,
    pub tx_ref: Option<String>,
}

/// An error returned by a handler.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    pub fn new<S: Into<String>>(status: StatusCode, error: &str, message: S) -> Self {
        Self {
            status,
            body: ErrorBody {
                error: error.to_string(),
                message: message.into(),
                stage: None,
                blob_address: None,
                tx_ref: None,
            },
        }
    }

    pub fn bad_request<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BadRequest", message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

/// HTTP status for an error kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::QuotaExceeded => StatusCode::INSUFFICIENT_STORAGE,
        ErrorKind::StoreUnavailable | ErrorKind::NetworkError | ErrorKind::FeeQueryError => {
            StatusCode::BAD_GATEWAY
        }
        ErrorKind::ConfirmationTimeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::NonceError => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::SubmissionError => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::EncodingError
        | ErrorKind::SigningError
        | ErrorKind::MalformedAcceptance
        | ErrorKind::DecodeError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<LifecycleError> for ApiError {
    fn from(e: LifecycleError) -> Self {
        let kind = e.kind();
        Self {
            status: status_for(kind),
            body: ErrorBody {
                error: kind.as_str().to_string(),
                message: e.to_string(),
                stage: Some(e.stage),
                blob_address: e.blob_address.map(|address| address.0),
                tx_ref: e.tx_ref.map(|tx_ref| tx_ref.hex()),
            },
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self {
        let error = match e {
            SessionError::NotArmed(_) => "SessionNotArmed",
            SessionError::Busy(_) => "SessionBusy",
        };
        Self::new(StatusCode::CONFLICT, error, e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self.body)).into_response()
    }
}
