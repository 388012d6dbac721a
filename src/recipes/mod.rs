pub mod dto;
pub mod handlers;
mod services;

pub use handlers::routes;
pub use services::RecipeService;
