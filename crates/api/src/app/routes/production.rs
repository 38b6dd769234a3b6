use std::sync::Arc;

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use crate::app::errors;
use crate::app::services::AppServices;

/// Greedy production suggestion over current stock. Read-only.
pub async fn suggest(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.suggestions().suggest().await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
