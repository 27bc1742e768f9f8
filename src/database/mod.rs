pub mod manager;
pub mod models;
pub mod repository;

pub use manager::{connect, DatabaseError};
pub use repository::{DrinkStore, PgDrinkStore, StoreError};
