use std::time::Instant;

use crate::Result;
use crate::http::request::Request;
use crate::http::response::Response;

/// HTTP 客户端，超时等行为使用 reqwest 的默认值
#[derive(Clone, Default)]
pub struct Client {
    inner: reqwest::Client,
}

impl Client {
    pub fn new() -> Self {
        Self::default()
    }

    /// 发送请求并读取完整 body
    ///
    /// 连接失败或读取 body 失败都返回错误。
    pub async fn execute(&self, request: Request) -> Result<Response> {
        let method = request.method.to_reqwest()?;
        let mut req = self
            .inner
            .request(method, request.url.as_str())
            .headers(request.headers);

        if let Some(body) = request.body {
            req = req.body(body);
        }

        let start = Instant::now();
        let response = req.send().await?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.text().await?;
        let duration = start.elapsed();

        Ok(Response::new(status, headers, body, duration))
    }
}
