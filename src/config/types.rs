use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::expect::Expectation;

fn default_method() -> String {
    "GET".to_string()
}

/// 单个请求定义，加载后不再修改
///
/// 除 `method` 外，所有文本字段都可以包含模板指令。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RequestSpec {
    /// 唯一名称，用作历史记录和指标的键
    pub name: String,

    /// URL 模板
    pub url: String,

    /// HTTP 方法（不做模板替换），缺省为 GET
    #[serde(default = "default_method")]
    pub method: String,

    /// 请求体模板
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,

    /// Header 名称 -> 值模板
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,

    /// Query 参数名称 -> 值模板
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, String>,

    /// 响应期望
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expect: Option<Expectation>,
}

impl RequestSpec {
    pub fn new(name: impl Into<String>, method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            method: method.into(),
            body: None,
            headers: BTreeMap::new(),
            params: BTreeMap::new(),
            expect: None,
        }
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_expect(mut self, expect: Expectation) -> Self {
        self.expect = Some(expect);
        self
    }

    /// 非空的请求体模板
    pub fn body_template(&self) -> Option<&str> {
        self.body.as_deref().filter(|b| !b.is_empty())
    }
}

/// TOML 请求文件: `[[request]]` 数组
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestFile {
    #[serde(default, rename = "request")]
    pub requests: Vec<RequestSpec>,
}
