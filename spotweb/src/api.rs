use crate::state::AppState;
use axum::Router;

mod markers;

pub fn router() -> Router<AppState> {
    Router::new().merge(markers::router())
}
