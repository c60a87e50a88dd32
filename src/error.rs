//! Error handling.

use axum::{
    extract::rejection::QueryRejection,
    http::header,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::error::Error;
use thiserror::Error;
use tokio::task::JoinError;
use tracing::{event, Level};

/// Message returned in place of the details of any server error.
pub const INTERNAL_SERVER_ERROR_MESSAGE: &str = "Internal server error";

/// Query service error type
///
/// This type encapsulates the various errors that may occur.
/// Each variant may result in a different API error response.
#[derive(Debug, Error)]
pub enum VizzError {
    /// A blocking document store task panicked or was cancelled
    #[error("document store task failed")]
    BlockingTask(#[from] JoinError),

    /// A stored document could not be decoded
    #[error("failed to decode document")]
    Document(#[from] serde_json::Error),

    /// A partition has no records, so its schema cannot be resolved
    #[error("partition {partition} contains no records")]
    EmptyPartition { partition: String },

    /// A record holds a material identifier that is neither text nor a number
    #[error("unsupported material value {value} in partition {partition}")]
    InvalidMaterial { partition: String, value: String },

    /// None of the material field spellings is present in a partition's first record
    #[error("no material field found in partition {partition}")]
    MaterialFieldUnresolved { partition: String },

    /// Error deserialising the query string
    #[error("request parameters are not valid")]
    RequestParamsRejection(#[from] QueryRejection),

    /// Error validating request parameters
    #[error("request parameters are not valid")]
    RequestParamsValidation(#[from] validator::ValidationErrors),

    /// A record does not follow its partition's schema
    #[error("record in partition {partition} is missing material field {field}")]
    SchemaMismatch {
        partition: String,
        field: &'static str,
    },

    /// Error reading from the sled database
    #[error("error reading from document store")]
    Store(#[from] sled::Error),

    /// Error reading from the filesystem
    #[error("error reading from document store")]
    StoreIo(#[from] std::io::Error),

    /// A monthly total exceeds the range of a JSON number
    #[error("{month} total of material {material} in partition {partition} is not finite")]
    VolumeOverflow {
        partition: String,
        material: String,
        month: crate::month::Month,
    },
}

impl IntoResponse for VizzError {
    /// Convert from a `VizzError` into an [axum::response::Response].
    fn into_response(self) -> Response {
        ErrorResponse::from(self).into_response()
    }
}

/// A response to send in error cases
///
/// Implements serde (de)serialise.
#[derive(Deserialize, Serialize)]
struct ErrorResponse {
    /// HTTP status of the response
    #[serde(skip)]
    status: StatusCode,

    /// Main error message
    error: String,

    /// Optional list of causes
    #[serde(skip_serializing_if = "Option::is_none")]
    caused_by: Option<Vec<String>>,
}

impl ErrorResponse {
    /// Return a client error response describing `error` and its causes.
    fn client_error<E>(status: StatusCode, error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        let mut causes = vec![];
        let mut current = error.source();
        while let Some(source) = current {
            causes.push(source.to_string());
            current = source.source();
        }
        // Remove duplicate entries.
        causes.dedup();
        ErrorResponse {
            status,
            error: error.to_string(),
            caused_by: (!causes.is_empty()).then_some(causes),
        }
    }

    /// Return a 400 bad request ErrorResponse
    fn bad_request<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        Self::client_error(StatusCode::BAD_REQUEST, error)
    }

    /// Return a 500 internal server error ErrorResponse
    ///
    /// The details of the error are logged, not returned.
    fn internal_server_error() -> Self {
        ErrorResponse {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: INTERNAL_SERVER_ERROR_MESSAGE.to_string(),
            caused_by: None,
        }
    }
}

impl From<VizzError> for ErrorResponse {
    /// Convert from a `VizzError` into an `ErrorResponse`.
    fn from(error: VizzError) -> Self {
        let response = match &error {
            // Bad request
            VizzError::RequestParamsRejection(_) | VizzError::RequestParamsValidation(_) => {
                Self::bad_request(&error)
            }

            // Internal server error
            VizzError::BlockingTask(_)
            | VizzError::Document(_)
            | VizzError::EmptyPartition { .. }
            | VizzError::InvalidMaterial { .. }
            | VizzError::MaterialFieldUnresolved { .. }
            | VizzError::SchemaMismatch { .. }
            | VizzError::Store(_)
            | VizzError::StoreIo(_)
            | VizzError::VolumeOverflow { .. } => Self::internal_server_error(),
        };

        // Log server errors.
        if response.status.is_server_error() {
            event!(Level::ERROR, "{}", error.to_string());
            let mut current = error.source();
            while let Some(source) = current {
                event!(Level::ERROR, "Caused by: {}", source.to_string());
                current = source.source();
            }
        }

        response
    }
}

impl IntoResponse for ErrorResponse {
    /// Convert from an `ErrorResponse` into an `axum::response::Response`.
    ///
    /// Renders the response as JSON.
    fn into_response(self) -> Response {
        let json_body = serde_json::to_string_pretty(&self);
        match json_body {
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to serialise error response: {}", err),
            )
                .into_response(),
            Ok(json_body) => (
                self.status,
                [(&header::CONTENT_TYPE, mime::APPLICATION_JSON.to_string())],
                json_body,
            )
                .into_response(),
        }
    }
}
