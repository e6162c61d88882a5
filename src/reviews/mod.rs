pub mod error;
pub mod handlers;
pub mod models;
pub mod rating_calculator;
pub mod repository;
pub mod service;

pub use error::*;
pub use handlers::*;
pub use models::*;
pub use rating_calculator::*;
pub use repository::*;
pub use service::*;
