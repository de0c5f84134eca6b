use std::time::Duration;

use crate::expect::ExpectationFailure;
use crate::http::{Response, StatusBucket};

/// 单个请求的执行结果
///
/// 只在本次执行中使用，交给历史记录、状态汇总和指标后即丢弃。
#[derive(Debug, Clone)]
pub struct ResponseResult {
    /// 请求名称
    pub name: String,

    /// 执行耗时
    pub latency: Duration,

    /// 状态分类
    pub bucket: StatusBucket,

    /// 原始状态码，传输失败时为 0
    pub status_code: u16,

    /// 响应体
    pub body: String,

    /// 传输错误（连接失败、读取失败、请求无法构建）
    pub error: Option<String>,

    /// 期望校验失败的描述，不影响状态分类
    pub expectation_failure: Option<ExpectationFailure>,
}

impl ResponseResult {
    pub fn completed(name: impl Into<String>, response: Response) -> Self {
        Self {
            name: name.into(),
            latency: response.duration,
            bucket: response.bucket(),
            status_code: response.status,
            body: response.body,
            error: None,
            expectation_failure: None,
        }
    }

    pub fn transport_error(name: impl Into<String>, error: String, latency: Duration) -> Self {
        Self {
            name: name.into(),
            latency,
            bucket: StatusBucket::Error,
            status_code: 0,
            body: String::new(),
            error: Some(error),
            expectation_failure: None,
        }
    }

    /// 是否在传输层失败
    pub fn is_transport_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn latency_secs(&self) -> f64 {
        self.latency.as_secs_f64()
    }
}
