pub mod dto;
pub mod handlers;
mod services;

pub use dto::{Ingredient, IngredientCreate};
pub use handlers::routes;
pub use services::IngredientService;
