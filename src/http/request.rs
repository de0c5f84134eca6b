use reqwest::header::{HeaderMap as Headers, HeaderName, HeaderValue};

use crate::http::types::Method;
use crate::{ProbeError, Result};

/// 已完成模板替换、可以直接发送的请求
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub headers: Headers,
    pub body: Option<String>,
}

impl Request {
    pub fn new(method: &str, url: &str) -> Result<Self> {
        Ok(Self {
            method: method.parse()?,
            url: url.to_string(),
            headers: Headers::new(),
            body: None,
        })
    }

    fn insert_header(&mut self, key: &str, value: &str) -> Result<()> {
        let header_name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|e| ProbeError::InvalidHeader(format!("{}: {}", key, e)))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|e| ProbeError::InvalidHeader(format!("{}: {}", key, e)))?;
        self.headers.insert(header_name, header_value);
        Ok(())
    }

    pub fn with_header(mut self, key: &str, value: &str) -> Result<Self> {
        self.insert_header(key, value)?;
        Ok(self)
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}
