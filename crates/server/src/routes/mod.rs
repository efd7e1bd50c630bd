use axum::Router;

use crate::AppState;

pub mod board;
pub mod health;

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .merge(health::router())
        .merge(board::router(&state));

    Router::new().nest("/api", api).with_state(state)
}
