pub mod engine;
pub mod units;

pub use engine::*;
pub use units::*;
