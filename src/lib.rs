pub mod config;
pub mod error;
pub mod gnc;
pub mod orbital;
pub mod planning;
pub mod sim;
pub mod vehicle;

pub use config::GuidanceConfig;
pub use error::{ConfigError, GuidanceError, Result};
