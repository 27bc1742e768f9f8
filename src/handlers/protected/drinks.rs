use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Extension, Json,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::app::AppState;
use crate::auth::ClaimSet;
use crate::database::models::{Drink, DrinkChanges, DrinkSummary, NewDrink, Recipe};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::types::DrinkId;

/// Body accepted by POST /drinks and PATCH /drinks/:id
#[derive(Debug, Default, Deserialize)]
pub struct DrinkPayload {
    pub title: Option<String>,
    pub recipe: Option<Value>,
}

impl DrinkPayload {
    /// Blank or missing fields count as not supplied
    fn into_changes(self) -> Result<DrinkChanges, ApiError> {
        let title = self.title.filter(|t| !t.trim().is_empty());
        let recipe = match self.recipe {
            Some(value) => Recipe::from_value(value)?,
            None => None,
        };
        Ok(DrinkChanges { title, recipe })
    }
}

/// GET /drinks - every drink, summary representation
pub async fn list(
    Extension(_claims): Extension<ClaimSet>,
    State(state): State<AppState>,
) -> ApiResult<Vec<DrinkSummary>> {
    let drinks = state.store.list().await?;
    Ok(ApiResponse::drinks(drinks.iter().map(Drink::summary).collect()))
}

/// GET /drinks-detail - every drink, detail representation
pub async fn list_detail(
    Extension(_claims): Extension<ClaimSet>,
    State(state): State<AppState>,
) -> ApiResult<Vec<Drink>> {
    let drinks = state.store.list().await?;
    Ok(ApiResponse::drinks(drinks))
}

/// POST /drinks - create a drink; both title and recipe are required
pub async fn post(
    Extension(_claims): Extension<ClaimSet>,
    State(state): State<AppState>,
    payload: Result<Json<DrinkPayload>, JsonRejection>,
) -> ApiResult<Vec<Drink>> {
    let Json(payload) = payload?;

    let DrinkChanges {
        title: Some(title),
        recipe: Some(recipe),
    } = payload.into_changes()?
    else {
        return Err(ApiError::bad_request("title and recipe are required"));
    };

    let drink = state.store.insert(NewDrink { title, recipe }).await?;
    info!("Created drink {} '{}'", drink.id, drink.title);

    Ok(ApiResponse::drinks(vec![drink]))
}

/// PATCH /drinks/:id - change the supplied fields, keep the rest
pub async fn patch(
    Extension(_claims): Extension<ClaimSet>,
    State(state): State<AppState>,
    id: Result<Path<DrinkId>, PathRejection>,
    payload: Result<Json<DrinkPayload>, JsonRejection>,
) -> ApiResult<Vec<Drink>> {
    let Path(id) = id?;
    let Json(payload) = payload?;

    let changes = payload.into_changes()?;
    if changes.is_empty() {
        return Err(ApiError::bad_request("title or recipe is required"));
    }

    // A missing drink is reported as a bad request, same as an empty update
    let drink = state
        .store
        .update(id, changes)
        .await?
        .ok_or_else(|| ApiError::bad_request(format!("drink {} does not exist", id)))?;
    info!("Updated drink {}", drink.id);

    Ok(ApiResponse::drinks(vec![drink]))
}

/// DELETE /drinks/:id
pub async fn delete(
    Extension(_claims): Extension<ClaimSet>,
    State(state): State<AppState>,
    id: Result<Path<DrinkId>, PathRejection>,
) -> ApiResult<DrinkId> {
    let Path(id) = id?;

    if !state.store.delete(id).await? {
        return Err(ApiError::bad_request(format!("drink {} does not exist", id)));
    }
    info!("Deleted drink {}", id);

    Ok(ApiResponse::deleted(id))
}
