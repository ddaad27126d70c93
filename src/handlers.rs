use crate::errors::AppError;
use crate::models::{DashboardView, MockToggle, PageParams, VisibilityRequest, VisibilityResponse};
use crate::state::AppState;
use crate::ui::render_index;
use axum::{
    extract::{Query, State},
    http::header,
    response::{Html, IntoResponse, Redirect},
    Json,
};

pub async fn index(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Html<String>, AppError> {
    let dashboard = &state.dashboard;

    if let Some(mock) = switch(params.mock, "mock")? {
        if mock != dashboard.mock_forced() {
            dashboard.set_mock(mock);
            dashboard.refresh().await;
        }
    }
    if let Some(dev) = switch(params.dev, "dev")? {
        dashboard.set_dev_mode(dev).await;
    }

    Ok(Html(render_index(&dashboard.view().await)))
}

pub async fn get_dashboard(State(state): State<AppState>) -> Json<DashboardView> {
    Json(state.dashboard.view().await)
}

pub async fn chart_svg(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let svg = state.dashboard.chart_svg().await.map_err(AppError::internal)?;
    Ok((
        [
            (header::CONTENT_TYPE, "image/svg+xml"),
            (header::CACHE_CONTROL, "no-store"),
        ],
        svg,
    ))
}

pub async fn refresh(State(state): State<AppState>) -> Json<DashboardView> {
    state.dashboard.refresh().await;
    Json(state.dashboard.view().await)
}

pub async fn refresh_form(State(state): State<AppState>) -> Redirect {
    state.dashboard.refresh().await;
    Redirect::to("/")
}

pub async fn set_mock(
    State(state): State<AppState>,
    Json(payload): Json<MockToggle>,
) -> Json<DashboardView> {
    state.dashboard.set_mock(payload.enabled);
    state.dashboard.refresh().await;
    Json(state.dashboard.view().await)
}

pub async fn visibility(
    State(state): State<AppState>,
    Json(payload): Json<VisibilityRequest>,
) -> Json<VisibilityResponse> {
    let refreshed = state.dashboard.on_visibility(payload.event).await;
    Json(VisibilityResponse { refreshed })
}

fn switch(value: Option<u8>, name: &str) -> Result<Option<bool>, AppError> {
    match value {
        None => Ok(None),
        Some(0) => Ok(Some(false)),
        Some(1) => Ok(Some(true)),
        Some(other) => Err(AppError::invalid_switch(name, other)),
    }
}
