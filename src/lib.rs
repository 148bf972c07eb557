pub mod config;
pub mod error;
pub mod forms;
pub mod handlers;
pub mod middleware;
pub mod migration;
pub mod models;
pub mod pagination;
pub mod response;
pub mod routes;
pub mod services;
pub mod utils;

pub use error::{AppError, AppResult};
pub use middleware::auth::AuthUser;
pub use pagination::{Page, Paginator};
pub use response::ApiResponse;
