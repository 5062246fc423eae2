use crate::{error::Error, state::AppState};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
};
use axum_extra::extract::WithRejection;
use libspot::{
    core::loadable::Loadable,
    marker::{Marker, MarkerFields, NewMarker},
};

type JsonBody<T> = WithRejection<Json<T>, Error>;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/markers",
            get(list_markers)
                .post(add_marker)
                .fallback(method_not_allowed),
        )
        .route(
            "/markers/{id}",
            put(modify_marker)
                .delete(delete_marker)
                .fallback(method_not_allowed),
        )
}

async fn list_markers(State(state): State<AppState>) -> Result<Json<Vec<Marker>>, Error> {
    let markers = Marker::load_all(&state.db).await?;
    Ok(Json(markers))
}

async fn add_marker(
    State(state): State<AppState>,
    WithRejection(Json(params), _): JsonBody<NewMarker>,
) -> Result<impl IntoResponse, Error> {
    let marker = Marker::create(params, &state.db).await?;
    Ok((StatusCode::CREATED, Json(marker)))
}

async fn modify_marker(
    Path(id): Path<String>,
    State(state): State<AppState>,
    WithRejection(Json(params), _): JsonBody<MarkerFields>,
) -> Result<Json<Marker>, Error> {
    let marker = Marker::update(&id, params, &state.db).await?;
    Ok(Json(marker))
}

async fn delete_marker(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Marker>, Error> {
    let marker = Marker::delete_id(&id, &state.db).await?;
    Ok(Json(marker))
}

async fn method_not_allowed() -> Error {
    Error::MethodNotAllowed
}
