pub mod auth;
mod fallback;
mod health;
mod products;

pub use auth::{login, logout, register};
pub use fallback::not_found;
pub use health::health_check;
pub use products::list_products;
