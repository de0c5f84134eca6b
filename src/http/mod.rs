/// HTTP 模块 - 请求构建、发送和状态分类
pub mod client;
pub mod request;
pub mod response;
pub mod types;

pub use client::Client;
pub use request::Request;
pub use response::Response;
pub use types::{Method, StatusBucket, merge_query};
