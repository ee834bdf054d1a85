mod dto;
mod handlers;
pub mod repo_types;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::me_routes())
        .merge(handlers::profile_routes())
}
