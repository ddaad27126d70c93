use crate::handlers;
use crate::state::AppState;
use axum::{routing::{get, post}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/refresh", post(handlers::refresh_form))
        .route("/chart.svg", get(handlers::chart_svg))
        .route("/api/dashboard", get(handlers::get_dashboard))
        .route("/api/refresh", post(handlers::refresh))
        .route("/api/mock", post(handlers::set_mock))
        .route("/api/visibility", post(handlers::visibility))
        .with_state(state)
}
