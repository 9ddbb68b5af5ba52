pub mod config;
pub mod ids;

pub use config::*;
pub use ids::*;
