pub mod auth;
pub mod response;

pub use auth::{require_permission, RequirePermission};
pub use response::{ApiResponse, ApiResult};
