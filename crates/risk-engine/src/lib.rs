pub mod engine;
pub mod models;

pub use engine::RiskEngine;
pub use models::*;
