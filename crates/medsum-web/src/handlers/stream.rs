use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use medsum_core::render::status_message;
use medsum_core::{Analysis, prepare_text, summarize, tag_entities};

use super::{blocking, error_response};
use crate::models::*;
use crate::state::AppState;
use crate::upload::{self, FormFields};

/// `POST /analyze/stream`: the same pipeline, reported stage by stage.
///
/// Form problems are answered with a plain 400; everything after that is
/// reported as SSE events, ending with `complete` or `error`.
pub async fn stream(State(state): State<Arc<AppState>>, multipart: Multipart) -> Response {
    let fields = match upload::parse_multipart(multipart).await {
        Ok(fields) => fields,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e),
    };

    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(16);

    tokio::spawn(async move {
        if let Err(e) = handle_stream(state, fields, tx.clone()).await {
            tracing::warn!(error = %e, "streamed analysis failed");
            let _ = tx
                .send(Ok(sse_event("error", &ErrorEvent { message: e })))
                .await;
        }
    });

    Sse::new(ReceiverStream::new(rx))
        .keep_alive(KeepAlive::default())
        .into_response()
}

async fn handle_stream(
    state: Arc<AppState>,
    fields: FormFields,
    tx: mpsc::Sender<Result<Event, Infallible>>,
) -> Result<(), String> {
    let FormFields { disease_name, file } = fields;

    send(
        &tx,
        "status",
        &StatusEvent {
            disease_name: disease_name.clone(),
            message: status_message(&disease_name),
        },
    )
    .await?;

    // Extraction and normalization (blocking I/O via MuPDF)
    let ctx = state.ctx.clone();
    let data = file.data;
    let prepared = blocking(move || prepare_text(ctx.pdf_backend(), &data)).await?;
    let text = match prepared {
        Ok(text) => Arc::new(text),
        Err(e) if e.is_warning() => {
            let message = e.to_string();
            send(&tx, "warning", &WarningEvent { message: message.clone() }).await?;
            send(
                &tx,
                "complete",
                &CompleteEvent {
                    result: AnalyzeResponse::warning(&disease_name, message),
                },
            )
            .await?;
            return Ok(());
        }
        Err(e) => return Err(format!("{}: {}", file.filename, e)),
    };

    let text_chars = text.chars().count();
    send(&tx, "extraction_complete", &ExtractionCompleteEvent { text_chars }).await?;

    let ctx = state.ctx.clone();
    let input = text.clone();
    let summary = blocking(move || {
        let model = ctx.summarizer()?;
        summarize(model.as_ref(), &input)
    })
    .await?
    .map_err(|e| format!("Summarization failed: {}", e))?;
    send(&tx, "summary", &SummaryEvent::from(&summary)).await?;

    let ctx = state.ctx.clone();
    let input = text.clone();
    let entities = blocking(move || {
        let model = ctx.token_classifier()?;
        tag_entities(model.as_ref(), &input)
    })
    .await?
    .map_err(|e| format!("Entity recognition failed: {}", e))?;
    send(
        &tx,
        "entities",
        &EntitiesEvent {
            entities: entities.iter().map(EntityJson::from).collect(),
        },
    )
    .await?;

    let analysis = Analysis {
        disease_name,
        text_chars,
        summary,
        entities,
    };
    send(
        &tx,
        "complete",
        &CompleteEvent {
            result: AnalyzeResponse::from_analysis(&analysis),
        },
    )
    .await?;

    Ok(())
}

async fn send<T: serde::Serialize>(
    tx: &mpsc::Sender<Result<Event, Infallible>>,
    event_type: &str,
    data: &T,
) -> Result<(), String> {
    tx.send(Ok(sse_event(event_type, data)))
        .await
        .map_err(|_| "Client disconnected".to_string())
}
