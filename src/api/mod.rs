pub mod error;
pub mod extract;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod types;

pub use error::ApiResult;
pub use routes::create_router;
pub use state::AppState;
