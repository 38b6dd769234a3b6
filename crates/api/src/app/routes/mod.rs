use axum::{Router, routing::get};

pub mod production;
pub mod products;
pub mod raw_materials;
pub mod system;

/// Router for every endpoint under `/api`.
///
/// The PascalCase paths are the ones the existing web client calls.
pub fn router() -> Router {
    Router::new()
        .nest("/products", products::router())
        .nest("/Products", products::router())
        .nest("/raw-materials", raw_materials::router())
        .nest("/RawMaterials", raw_materials::router())
        .route("/production", get(production::suggest))
        .route("/Production", get(production::suggest))
}
