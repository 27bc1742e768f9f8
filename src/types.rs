/// Shared types used across the codebase

/// Permission strings issued by the identity provider, one per drinks route
pub mod permissions {
    pub const GET_DRINKS: &str = "get:drinks";
    pub const GET_DRINKS_DETAIL: &str = "get:drinks-detail";
    pub const POST_DRINKS: &str = "post:drinks";
    pub const PATCH_DRINKS: &str = "patch:drinks";
    pub const DELETE_DRINKS: &str = "delete:drinks";
}

/// Server-assigned drink identifier
pub type DrinkId = i32;
