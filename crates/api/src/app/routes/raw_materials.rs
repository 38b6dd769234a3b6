use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use autoflex_catalog::RawMaterial;
use autoflex_core::RawMaterialId;

use crate::app::{dto, errors};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_raw_materials).post(create_raw_material))
        .route(
            "/:id",
            get(get_raw_material)
                .put(update_raw_material)
                .delete(delete_raw_material),
        )
}

pub async fn list_raw_materials(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.store().list_raw_materials().await {
        Ok(items) => (StatusCode::OK, Json(items)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_raw_material(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let raw_material_id = match dto::parse_raw_material_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };

    match services.store().get_raw_material(raw_material_id).await {
        Ok(rm) => (StatusCode::OK, Json(rm)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn create_raw_material(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::RawMaterialRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };

    let raw_material = match RawMaterial::create(RawMaterialId::new(), body.into()) {
        Ok(rm) => rm,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.store().create_raw_material(raw_material.clone()).await {
        Ok(()) => (StatusCode::CREATED, Json(raw_material)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn update_raw_material(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<dto::RawMaterialRequest>, JsonRejection>,
) -> axum::response::Response {
    let raw_material_id = match dto::parse_raw_material_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };

    match services
        .store()
        .update_raw_material(raw_material_id, body.into())
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// Also removes the material from every bill of materials that used it.
pub async fn delete_raw_material(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let raw_material_id = match dto::parse_raw_material_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };

    match services.store().delete_raw_material(raw_material_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
