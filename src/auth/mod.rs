use crate::state::AppState;
use axum::Router;

pub mod claims;
pub mod dto;
mod handlers;
pub mod jwt;
mod password;
pub mod repo_types;
pub(crate) mod services;

pub use jwt::{AuthUser, JwtKeys};

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::auth_routes())
}
