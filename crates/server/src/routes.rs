use std::path::Path;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use expensa_extract::{GenerativeModel, ReceiptPipeline};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Build the service router.
///
///   POST /receipt   JPEG body in, expense JSON out
///   *               static assets from `static_dir`
pub fn router<M>(pipeline: Arc<ReceiptPipeline<M>>, static_dir: &Path, body_limit: usize) -> Router
where
    M: GenerativeModel + 'static,
{
    Router::new()
        .route("/receipt", post(receive_receipt::<M>))
        .with_state(pipeline)
        .fallback_service(ServeDir::new(static_dir))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
}

fn is_jpeg(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("image/jpeg"))
}

/// POST /receipt: extract one receipt.
async fn receive_receipt<M: GenerativeModel>(
    State(pipeline): State<Arc<ReceiptPipeline<M>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !is_jpeg(&headers) {
        return (
            StatusCode::BAD_REQUEST,
            "Content-Type must be image/jpeg; send the raw JPEG bytes as the request body.\n",
        )
            .into_response();
    }

    match pipeline.process_bytes(&body).await {
        Ok(expense) => {
            info!(shop = %expense.shop, amount = expense.amount, "receipt extracted");
            Json(expense).into_response()
        }
        Err(e) => {
            error!(error = %e, bytes = body.len(), "receipt extraction failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Receipt extraction failed.\n").into_response()
        }
    }
}
