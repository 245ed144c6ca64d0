pub mod bmc;
pub mod ctx;
pub mod db;
pub mod db_model_manager;
pub mod error;
pub mod proxy;

pub use ctx::*;
pub use db::*;
pub use db_model_manager::*;
pub use error::*;
pub use proxy::*;
