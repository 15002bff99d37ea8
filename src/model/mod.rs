pub mod config;
pub mod project;

pub use config::*;
pub use project::*;
