use crate::http::types::StatusBucket;
use reqwest::header::HeaderMap as Headers;
use std::time::Duration;

/// 完成的 HTTP 交换
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub headers: Headers,
    pub body: String,
    /// 从发送到读完 body 的耗时
    pub duration: Duration,
}

impl Response {
    pub fn new(status: u16, headers: Headers, body: String, duration: Duration) -> Self {
        Self {
            status,
            headers,
            body,
            duration,
        }
    }

    pub fn bucket(&self) -> StatusBucket {
        StatusBucket::from_code(self.status)
    }

    pub fn is_error(&self) -> bool {
        self.status >= 400
    }
}
