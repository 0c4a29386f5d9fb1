pub mod error;
pub mod extract;
pub mod routes;
pub mod server;
pub mod service;

pub use error::{ApiError, ApiResult, ErrorCode};
pub use server::{build_router, start, AppState, ServerConfig, ServerHandle};
pub use service::{TaskService, UserService};
