use super::AppState;
use crate::core::error::AppError;
use crate::core::job::ObfuscateRequest;
use crate::core::types::{JobPhase, Preset};
use axum::{
    body::Body,
    extract::{rejection::JsonRejection, Extension},
    http::{Response, StatusCode},
    response::{IntoResponse, Json},
};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

pub const PAYLOAD_TOO_LARGE_MESSAGE: &str = "Payload too large";
pub const INVALID_BODY_MESSAGE: &str = "Invalid JSON body";
pub const FAILURE_MESSAGE: &str = "Obfuscation failed";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObfuscateResponse {
    pub success: bool,
    pub obfuscated_code: String,
    pub preset: Preset,
}

pub async fn health(Extension(state): Extension<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": state.health_message,
    }))
}

pub async fn obfuscate(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<ObfuscateRequest>, JsonRejection>,
) -> Result<Json<ObfuscateResponse>, ApiRejection> {
    let Json(request) = payload.map_err(ApiRejection::from_json_rejection)?;

    tracing::debug!(phase = %JobPhase::Validating, "job phase");
    let job = request.validate().map_err(ApiRejection::from_app_error)?;

    let outcome = state
        .runner
        .run(job)
        .await
        .map_err(ApiRejection::from_app_error)?;

    Ok(Json(ObfuscateResponse {
        success: true,
        obfuscated_code: outcome.output,
        preset: outcome.preset,
    }))
}

pub struct ApiRejection {
    status: StatusCode,
    body: Value,
}

impl ApiRejection {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: json!({ "error": message.into() }),
        }
    }

    fn payload_too_large() -> Self {
        Self {
            status: StatusCode::PAYLOAD_TOO_LARGE,
            body: json!({ "error": PAYLOAD_TOO_LARGE_MESSAGE }),
        }
    }

    fn internal(message: String) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: json!({
                "error": FAILURE_MESSAGE,
                "message": message,
            }),
        }
    }

    fn from_json_rejection(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return Self::payload_too_large();
        }
        tracing::debug!(error = %rejection.body_text(), "rejected request body");
        Self::bad_request(INVALID_BODY_MESSAGE)
    }

    // The full error has already been logged by the job runner.
    fn from_app_error(err: AppError) -> Self {
        if err.category.is_client_error() {
            Self::bad_request(err.public_message())
        } else {
            Self::internal(err.public_message())
        }
    }
}

impl IntoResponse for ApiRejection {
    fn into_response(self) -> Response<Body> {
        let mut resp = Json(self.body).into_response();
        *resp.status_mut() = self.status;
        resp
    }
}
