pub mod store;

pub use store::ResponseHistory;
