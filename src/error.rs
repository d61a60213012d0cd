//! Error handling.

use crate::loader::Partition;
use crate::query::QueryKind;

use arrow_schema::ArrowError;
use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::header,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use parquet::errors::ParquetError;
use serde::{Deserialize, Serialize};
use std::error::Error;
use thiserror::Error;
use tokio::sync::AcquireError;
use tokio::task::JoinError;
use tracing::{event, Level};

/// Error reading one partition file.
#[derive(Debug, Error)]
pub enum PartitionError {
    /// Error opening the partition file
    #[error("failed to read partition file")]
    Io(#[from] std::io::Error),

    /// Error decoding Parquet data
    #[error("failed to decode parquet data")]
    Parquet(#[from] ParquetError),

    /// Error reading or converting a column
    #[error("failed to convert column data")]
    Arrow(#[from] ArrowError),

    /// A required column is absent from the file
    #[error("missing required column {0}")]
    MissingColumn(&'static str),
}

/// Taxi analysis error type
///
/// This type encapsulates the various errors that may occur.
/// Each variant may result in a different API error response.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Error loading a partition of the dataset
    #[error("failed to load partition {partition}")]
    PartitionLoad {
        partition: Partition,
        #[source]
        source: PartitionError,
    },

    /// Unsupported year filter
    #[error("invalid year {0:?}, expected 2019, 2020 or both")]
    InvalidYear(String),

    /// Unsupported month filter
    #[error("invalid month {0:?}, expected 10, 11, 12 or all")]
    InvalidMonth(String),

    /// Error deserialising request query parameters
    #[error("request query is not valid")]
    QueryRejection(#[from] QueryRejection),

    /// Error deserialising request data
    #[error("request data is not valid")]
    RequestDataJsonRejection(#[from] JsonRejection),

    /// Error validating request data (single error)
    #[error("request data is not valid")]
    RequestDataValidationSingle(#[from] validator::ValidationError),

    /// Error validating request data (multiple errors)
    #[error("request data is not valid")]
    RequestDataValidation(#[from] validator::ValidationErrors),

    /// Error acquiring a semaphore
    #[error("error acquiring resources")]
    SemaphoreAcquireError(#[from] AcquireError),

    /// Error joining a blocking analysis task
    #[error("analysis task failed")]
    TaskJoin(#[from] JoinError),

    /// A cached result does not have the type its query produces
    #[error("cached result for {kind} has an unexpected type")]
    CacheEntryType { kind: QueryKind },
}

impl IntoResponse for AnalysisError {
    /// Convert from an `AnalysisError` into an [axum::response::Response].
    fn into_response(self) -> Response {
        ErrorResponse::from(self).into_response()
    }
}

/// Body of error response
///
/// Implements serde (de)serialise.
#[derive(Deserialize, Serialize)]
struct ErrorBody {
    /// Main error message
    message: String,

    /// Optional list of causes
    #[serde(skip_serializing_if = "Option::is_none")]
    caused_by: Option<Vec<String>>,
}

impl ErrorBody {
    /// Return a new ErrorBody
    ///
    /// # Arguments
    ///
    /// * `error`: The error that occurred
    fn new<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        let message = error.to_string();
        let mut caused_by = None;
        let mut current = error.source();
        while let Some(source) = current {
            let mut causes: Vec<String> = caused_by.unwrap_or_default();
            causes.push(source.to_string());
            caused_by = Some(causes);
            current = source.source();
        }
        // Remove duplicate entries.
        if let Some(caused_by) = caused_by.as_mut() {
            caused_by.dedup()
        }
        ErrorBody { message, caused_by }
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

    /// Response body
    error: ErrorBody,
}

impl ErrorResponse {
    /// Return a new ErrorResponse
    ///
    /// # Arguments
    ///
    /// * `status`: HTTP status of the response
    /// * `error`: The error that occurred. This will be formatted into a suitable `ErrorBody`
    fn new<E>(status: StatusCode, error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        ErrorResponse {
            status,
            error: ErrorBody::new(error),
        }
    }

    /// Return a 400 bad request ErrorResponse
    fn bad_request<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        Self::new(StatusCode::BAD_REQUEST, error)
    }

    /// Return a 500 internal server error ErrorResponse
    fn internal_server_error<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, error)
    }
}

impl From<AnalysisError> for ErrorResponse {
    /// Convert from an `AnalysisError` into an `ErrorResponse`.
    fn from(error: AnalysisError) -> Self {
        let response = match &error {
            // Bad request
            AnalysisError::InvalidYear(_)
            | AnalysisError::InvalidMonth(_)
            | AnalysisError::QueryRejection(_)
            | AnalysisError::RequestDataJsonRejection(_)
            | AnalysisError::RequestDataValidationSingle(_)
            | AnalysisError::RequestDataValidation(_) => Self::bad_request(&error),

            // Internal server error
            AnalysisError::PartitionLoad { .. }
            | AnalysisError::SemaphoreAcquireError(_)
            | AnalysisError::TaskJoin(_)
            | AnalysisError::CacheEntryType { .. } => Self::internal_server_error(&error),
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

#[cfg(test)]
mod tests {
    use super::*;

    use hyper::HeaderMap;

    // Jump through the hoops to get the body as a string.
    async fn body_string(response: Response) -> String {
        String::from_utf8(
            hyper::body::to_bytes(response.into_body())
                .await
                .unwrap()
                .to_vec(),
        )
        .unwrap()
    }

    async fn test_analysis_error(
        error: AnalysisError,
        status: StatusCode,
        message: &str,
        caused_by: Option<Vec<&'static str>>,
    ) {
        let response = error.into_response();
        assert_eq!(status, response.status());
        let mut headers = HeaderMap::new();
        headers.insert(&header::CONTENT_TYPE, "application/json".parse().unwrap());
        assert_eq!(headers, *response.headers());
        let error_response: ErrorResponse =
            serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(message.to_string(), error_response.error.message);
        // Map Vec items from str to String
        let caused_by = caused_by.map(|cb| cb.iter().map(|s| s.to_string()).collect());
        assert_eq!(caused_by, error_response.error.caused_by);
    }

    #[tokio::test]
    async fn partition_load_io_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let error = AnalysisError::PartitionLoad {
            partition: Partition::new(2019, 11),
            source: PartitionError::Io(io_error),
        };
        let message = "failed to load partition 2019-11";
        let caused_by = Some(vec!["failed to read partition file", "no such file"]);
        test_analysis_error(error, StatusCode::INTERNAL_SERVER_ERROR, message, caused_by).await;
    }

    #[tokio::test]
    async fn partition_load_missing_column() {
        let error = AnalysisError::PartitionLoad {
            partition: Partition::new(2020, 12),
            source: PartitionError::MissingColumn("total_amount"),
        };
        let message = "failed to load partition 2020-12";
        let caused_by = Some(vec!["missing required column total_amount"]);
        test_analysis_error(error, StatusCode::INTERNAL_SERVER_ERROR, message, caused_by).await;
    }

    #[tokio::test]
    async fn invalid_year() {
        let error = AnalysisError::InvalidYear("2021".to_string());
        let message = "invalid year \"2021\", expected 2019, 2020 or both";
        test_analysis_error(error, StatusCode::BAD_REQUEST, message, None).await;
    }

    #[tokio::test]
    async fn invalid_month() {
        let error = AnalysisError::InvalidMonth("1".to_string());
        let message = "invalid month \"1\", expected 10, 11, 12 or all";
        test_analysis_error(error, StatusCode::BAD_REQUEST, message, None).await;
    }

    #[tokio::test]
    async fn request_data_validation_single() {
        let validation_error = validator::ValidationError::new("foo");
        let error = AnalysisError::RequestDataValidationSingle(validation_error);
        let message = "request data is not valid";
        let caused_by = Some(vec!["Validation error: foo [{}]"]);
        test_analysis_error(error, StatusCode::BAD_REQUEST, message, caused_by).await;
    }

    #[tokio::test]
    async fn request_data_validation() {
        let mut validation_errors = validator::ValidationErrors::new();
        let validation_error = validator::ValidationError::new("foo");
        validation_errors.add("bar", validation_error);
        let error = AnalysisError::RequestDataValidation(validation_errors);
        let message = "request data is not valid";
        let caused_by = Some(vec!["bar: Validation error: foo [{}]"]);
        test_analysis_error(error, StatusCode::BAD_REQUEST, message, caused_by).await;
    }

    #[tokio::test]
    async fn semaphore_acquire_error() {
        let sem = tokio::sync::Semaphore::new(1);
        sem.close();
        let error = AnalysisError::SemaphoreAcquireError(sem.acquire().await.unwrap_err());
        let message = "error acquiring resources";
        let caused_by = Some(vec!["semaphore closed"]);
        test_analysis_error(error, StatusCode::INTERNAL_SERVER_ERROR, message, caused_by).await;
    }

    #[tokio::test]
    async fn task_join_error() {
        let handle = tokio::spawn(async { panic!("boom") });
        let error = AnalysisError::TaskJoin(handle.await.unwrap_err());
        let response = error.into_response();
        assert_eq!(StatusCode::INTERNAL_SERVER_ERROR, response.status());
        let body = body_string(response).await;
        assert!(body.contains("analysis task failed"), "body: {body}");
    }

    #[tokio::test]
    async fn cache_entry_type() {
        let error = AnalysisError::CacheEntryType {
            kind: QueryKind::HourlyPattern,
        };
        let message = "cached result for hourly_pattern has an unexpected type";
        test_analysis_error(error, StatusCode::INTERNAL_SERVER_ERROR, message, None).await;
    }
}
