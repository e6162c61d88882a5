pub mod alerts;
pub mod error;
pub mod handlers;
pub mod ledger;
pub mod models;
pub mod repository;
pub mod service;

pub use alerts::*;
pub use error::*;
pub use handlers::*;
pub use ledger::*;
pub use models::*;
pub use repository::*;
pub use service::*;
