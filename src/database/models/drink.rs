use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use thiserror::Error;

use crate::types::DrinkId;

#[derive(Debug, Error)]
pub enum RecipeError {
    #[error("recipe must be an ingredient or a list of ingredients")]
    Shape,

    #[error("invalid ingredient: {0}")]
    Ingredient(#[source] serde_json::Error),

    #[error("ingredient name must not be empty")]
    EmptyName,

    #[error("recipe encoding error: {0}")]
    Encoding(#[source] serde_json::Error),
}

/// One line of a recipe: what goes in and in what relative amount
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub parts: u32,
}

/// Ingredient without its quantity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngredientSummary {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Ordered, non-empty list of ingredients. Stored as a JSON text column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Recipe(Vec<Ingredient>);

impl Recipe {
    pub fn new(ingredients: Vec<Ingredient>) -> Result<Self, RecipeError> {
        if ingredients.is_empty() {
            return Err(RecipeError::Shape);
        }
        if ingredients.iter().any(|i| i.name.trim().is_empty()) {
            return Err(RecipeError::EmptyName);
        }
        Ok(Self(ingredients))
    }

    /// Interpret a request value. `Ok(None)` means nothing was supplied:
    /// null, an empty list, an empty object or an empty string.
    pub fn from_value(value: Value) -> Result<Option<Self>, RecipeError> {
        let ingredients = match value {
            Value::Null => return Ok(None),
            Value::String(s) if s.is_empty() => return Ok(None),
            Value::Array(items) if items.is_empty() => return Ok(None),
            Value::Object(map) if map.is_empty() => return Ok(None),
            Value::Array(items) => items
                .into_iter()
                .map(serde_json::from_value::<Ingredient>)
                .collect::<Result<Vec<_>, _>>()
                .map_err(RecipeError::Ingredient)?,
            single @ Value::Object(_) => {
                vec![serde_json::from_value::<Ingredient>(single).map_err(RecipeError::Ingredient)?]
            }
            _ => return Err(RecipeError::Shape),
        };
        Self::new(ingredients).map(Some)
    }

    pub fn encode(&self) -> Result<String, RecipeError> {
        serde_json::to_string(&self.0).map_err(RecipeError::Encoding)
    }

    pub fn decode(raw: &str) -> Result<Self, RecipeError> {
        let ingredients: Vec<Ingredient> = serde_json::from_str(raw).map_err(RecipeError::Encoding)?;
        Self::new(ingredients)
    }

    pub fn ingredients(&self) -> &[Ingredient] {
        &self.0
    }
}

/// Detail representation: the full recipe, quantities included
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Drink {
    pub id: DrinkId,
    pub title: String,
    pub recipe: Recipe,
}

/// Summary representation: recipe with quantities elided
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DrinkSummary {
    pub id: DrinkId,
    pub title: String,
    pub recipe: Vec<IngredientSummary>,
}

impl Drink {
    pub fn summary(&self) -> DrinkSummary {
        DrinkSummary {
            id: self.id,
            title: self.title.clone(),
            recipe: self
                .recipe
                .ingredients()
                .iter()
                .map(|i| IngredientSummary {
                    name: i.name.clone(),
                    color: i.color.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewDrink {
    pub title: String,
    pub recipe: Recipe,
}

/// Partial update; `None` fields keep their stored value
#[derive(Debug, Clone, Default)]
pub struct DrinkChanges {
    pub title: Option<String>,
    pub recipe: Option<Recipe>,
}

impl DrinkChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.recipe.is_none()
    }

    pub fn apply(self, drink: &mut Drink) {
        if let Some(title) = self.title {
            drink.title = title;
        }
        if let Some(recipe) = self.recipe {
            drink.recipe = recipe;
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DrinkRow {
    pub id: DrinkId,
    pub title: String,
    pub recipe: String,
}

impl TryFrom<DrinkRow> for Drink {
    type Error = RecipeError;

    fn try_from(row: DrinkRow) -> Result<Self, Self::Error> {
        Ok(Drink {
            id: row.id,
            title: row.title,
            recipe: Recipe::decode(&row.recipe)?,
        })
    }
}
