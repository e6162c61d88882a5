pub mod error;
pub mod handlers;
pub mod models;
pub mod order_number;
pub mod price_calculator;
pub mod repository;
pub mod service;
pub mod status_machine;

pub use error::*;
pub use handlers::*;
pub use models::*;
pub use order_number::*;
pub use price_calculator::*;
pub use repository::*;
pub use service::*;
pub use status_machine::*;
