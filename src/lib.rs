pub mod config;
pub mod logging;
pub mod persistence;
pub mod progress;
pub mod response;
pub mod routes;
pub mod state;
pub mod storage;

use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

pub fn create_app(state: AppState) -> axum::Router {
    routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
