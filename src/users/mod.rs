use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod email;
pub mod errors;
pub mod handlers;
pub mod manager;
pub mod memory;
pub mod model;
pub mod repo;

pub use errors::UserError;
pub use manager::UserManager;
pub use model::{Authenticatable, PermissionHolder, User, UserFields};
pub use repo::{PgUserRepository, UserRepository};

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::auth_routes())
        .merge(handlers::me_routes())
}
