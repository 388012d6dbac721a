pub mod dto;
pub mod handlers;
mod services;

pub use dto::{UnitCreate, UnitWithType};
pub use handlers::routes;
pub use services::UnitService;
