//! Routes for the athlete assignment board.

use axum::{
    Json, Router,
    extract::State,
    response::Json as ResponseJson,
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use services::services::{
    board_view::BoardView,
    drag_monitor::DropEvent,
    move_resolver::{MoveCommand, MoveOutcome},
};
use tracing::debug;
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct SearchRequest {
    #[serde(default)]
    pub term: String,
}

async fn current_view(state: &AppState) -> BoardView {
    let view = state.board().view().await;
    (*view).clone()
}

pub async fn get_board(State(state): State<AppState>) -> ResponseJson<ApiResponse<BoardView>> {
    ResponseJson(ApiResponse::success(current_view(&state).await))
}

/// Set the search filter and return the filtered view
pub async fn set_search(
    State(state): State<AppState>,
    Json(payload): Json<SearchRequest>,
) -> ResponseJson<ApiResponse<BoardView>> {
    state.board().set_search_term(payload.term).await;
    ResponseJson(ApiResponse::success(current_view(&state).await))
}

/// Refetch everything from the backend
pub async fn refresh_board(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<BoardView>>, ApiError> {
    state.board().refresh().await?;
    Ok(ResponseJson(ApiResponse::success(current_view(&state).await)))
}

/// Drop event straight from the drag library. Drops this board does not
/// handle answer with no outcome.
pub async fn drop_card(
    State(state): State<AppState>,
    Json(event): Json<DropEvent>,
) -> Result<ResponseJson<ApiResponse<Option<MoveOutcome>>>, ApiError> {
    let Some(command) = state.board().monitor().adapt(&event)? else {
        debug!("Drop ignored");
        return Ok(ResponseJson(ApiResponse::success(None)));
    };

    let outcome = state.board().dispatch_move(command).await?;
    Ok(ResponseJson(ApiResponse::success(Some(outcome))))
}

pub async fn move_card(
    State(state): State<AppState>,
    Json(command): Json<MoveCommand>,
) -> Result<ResponseJson<ApiResponse<MoveOutcome>>, ApiError> {
    let outcome = state.board().dispatch_move(command).await?;
    Ok(ResponseJson(ApiResponse::success(outcome)))
}

pub fn router(_state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/board", get(get_board))
        .route("/board/search", put(set_search))
        .route("/board/refresh", post(refresh_board))
        .route("/board/drop", post(drop_card))
        .route("/board/moves", post(move_card))
}
