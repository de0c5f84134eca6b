pub mod config;
pub mod error;
pub mod expect;
pub mod history;
pub mod http;
pub mod logger;
pub mod metrics;
pub mod runner;
pub mod server;
pub mod status;
pub mod template;

// Re-export commonly used types
pub use error::{ProbeError, Result};
