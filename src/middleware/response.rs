use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::json;

use crate::types::DrinkId;

/// Wrapper for API responses that adds the `{ success: true, <key>: ... }` envelope
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub key: &'static str,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(key: &'static str, data: T) -> Self {
        Self { key, data }
    }

    /// `{ success: true, drinks: ... }`
    pub fn drinks(data: T) -> Self {
        Self::new("drinks", data)
    }
}

impl ApiResponse<DrinkId> {
    /// `{ success: true, delete: id }`
    pub fn deleted(id: DrinkId) -> Self {
        Self::new("delete", id)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        // Convert data to JSON Value for consistent envelope format
        let data_value = match serde_json::to_value(&self.data) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("Failed to serialize response data: {}", e);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "success": false,
                        "error": 500,
                        "message": "Failed to serialize response data"
                    })),
                )
                    .into_response();
            }
        };

        let mut envelope = json!({ "success": true });
        envelope[self.key] = data_value;

        (StatusCode::OK, Json(envelope)).into_response()
    }
}

pub type ApiResult<T> = Result<ApiResponse<T>, crate::error::ApiError>;
