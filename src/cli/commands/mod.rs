//! CLI command implementations.

mod build;
mod config;
mod doctor;
mod recommend;
mod search;
mod serve;

pub use build::run_build;
pub use config::run_config;
pub use doctor::run_doctor;
pub use recommend::run_recommend;
pub use search::run_search;
pub use serve::run_serve;
