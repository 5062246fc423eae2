use crate::state::AppState;
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, warn};

#[derive(thiserror::Error, Debug)]
pub(crate) enum Error {
    #[error(transparent)]
    Libspot(#[from] libspot::Error),
    #[error("The request body was rejected: {0}")]
    BadRequestJsonRejection(#[from] JsonRejection),
    #[error("Method not allowed")]
    MethodNotAllowed,
}

impl Error {
    pub(crate) fn to_client_status(&self) -> (StatusCode, String) {
        match self {
            Error::Libspot(e) => match e {
                libspot::Error::MarkerNotFound(_) => (StatusCode::NOT_FOUND, e.to_string()),
                e if e.is_validation() => (StatusCode::BAD_REQUEST, e.to_string()),
                _ => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                ),
            },
            Error::BadRequestJsonRejection(rejection) => {
                (StatusCode::BAD_REQUEST, rejection.body_text())
            }
            Error::MethodNotAllowed => (StatusCode::METHOD_NOT_ALLOWED, self.to_string()),
        }
    }
}

// Tell axum how to convert `Error` into a response.
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // placeholder, will get refined in the response mapper
        let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
        // insert the error into the response so that we can log it in the response mapper.
        response.extensions_mut().insert(Arc::new(self));
        response
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

/// Turns an [Error] that was stashed in the response by a handler into a json
/// error body with the appropriate status code
pub(crate) async fn map_error_response(State(state): State<AppState>, response: Response) -> Response {
    let Some(err) = response.extensions().get::<Arc<Error>>().cloned() else {
        return response;
    };
    let (status, message) = err.to_client_status();
    if status.is_server_error() {
        error!(?err, "Request failed");
    } else {
        warn!(%err, "Request was rejected");
    }
    let body = ErrorBody {
        error: message,
        details: state
            .config
            .expose_error_details
            .then(|| format!("{err:#}")),
    };
    (status, Json(body)).into_response()
}
