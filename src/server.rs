//! HTTP layer: one `POST /recognize_math` route accepting a multipart upload
//! and answering with the predicted label.
//!
//! The loaded model is read-only shared state; each request only touches its
//! own decode buffers, so handlers run concurrently without locking.

use crate::infer::{RecognizeError, Recognizer};
use axum::{
    Json, Router,
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use burn::prelude::*;
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
struct RecognizeResponse {
    latex: &'static str,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for RecognizeError {
    fn into_response(self) -> Response {
        let status = match self {
            RecognizeError::MissingImage | RecognizeError::EmptyImage => StatusCode::BAD_REQUEST,
            RecognizeError::Decode(_) | RecognizeError::Inference(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Builds the application router around an already loaded recognizer.
pub fn router<B: Backend>(recognizer: Recognizer<B>) -> Router {
    Router::new()
        .route("/recognize_math", post(recognize_math::<B>))
        .with_state(Arc::new(recognizer))
}

async fn recognize_math<B: Backend>(
    State(context): State<Arc<Recognizer<B>>>,
    mut multipart: Multipart,
) -> Result<Json<RecognizeResponse>, RecognizeError> {
    let mut image_bytes = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| RecognizeError::Decode(err.to_string()))?
    {
        if field.name() == Some("image") {
            let bytes = field
                .bytes()
                .await
                .map_err(|err| RecognizeError::Decode(err.to_string()))?;
            image_bytes = Some(bytes);
            break;
        }
    }

    let bytes = image_bytes.ok_or(RecognizeError::MissingImage)?;
    let latex = context.recognize(&bytes)?;
    tracing::info!(label = latex, size = bytes.len(), "recognized upload");

    Ok(Json(RecognizeResponse { latex }))
}

/// Binds the listener and serves requests until the process is stopped.
pub async fn serve<B: Backend>(recognizer: Recognizer<B>, port: u16) {
    let app = router(recognizer);
    let address = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .expect("Failed to bind the server address");
    tracing::info!("listening on {address}");
    axum::serve(listener, app)
        .await
        .expect("Server terminated unexpectedly");
}
