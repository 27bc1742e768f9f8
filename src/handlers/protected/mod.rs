// handlers/protected/mod.rs - Protected handlers (bearer token + permission required)
//
// Each handler here is registered behind the authorization gate and receives
// the verified claim set as an extension. The gate has already run by the time
// any of these execute.

pub mod drinks;

// Re-export handler functions for use in routing
pub use drinks::list as drinks_get;
pub use drinks::list_detail as drinks_detail_get;
pub use drinks::post as drinks_post;
pub use drinks::patch as drinks_patch;
pub use drinks::delete as drinks_delete;
