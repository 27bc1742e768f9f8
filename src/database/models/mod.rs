pub mod drink;

pub use drink::{Drink, DrinkChanges, DrinkRow, DrinkSummary, Ingredient, NewDrink, Recipe, RecipeError};
