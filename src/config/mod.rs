pub mod loader;
pub mod types;

pub use loader::RequestLoader;
pub use types::{RequestFile, RequestSpec};
