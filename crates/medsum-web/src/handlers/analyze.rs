use axum::Json;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

use medsum_core::{AnalysisRequest, PipelineError};

use super::{blocking, error_response};
use crate::models::AnalyzeResponse;
use crate::state::AppState;
use crate::upload;

/// `POST /analyze`: run the whole pipeline and answer with one JSON body.
pub async fn analyze(State(state): State<Arc<AppState>>, multipart: Multipart) -> Response {
    let fields = match upload::parse_multipart(multipart).await {
        Ok(fields) => fields,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e),
    };

    let ctx = state.ctx.clone();
    let disease_name = fields.disease_name.clone();
    let data = fields.file.data;
    let result = blocking(move || {
        medsum_core::analyze(
            &ctx,
            AnalysisRequest {
                document: &data,
                disease_name: &disease_name,
            },
        )
    })
    .await;

    match result {
        Ok(Ok(analysis)) => Json(AnalyzeResponse::from_analysis(&analysis)).into_response(),
        Ok(Err(e)) if e.is_warning() => {
            Json(AnalyzeResponse::warning(&fields.disease_name, e.to_string())).into_response()
        }
        Ok(Err(e @ PipelineError::DocumentFormat(_))) => {
            tracing::warn!(file = %fields.file.filename, error = %e, "unreadable upload");
            error_response(StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
        }
        Ok(Err(e)) => {
            tracing::error!(error = %e, "analysis failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}
