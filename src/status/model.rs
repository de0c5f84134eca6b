use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

/// 每个名称在每个列表中最多保留的条目数
pub const STATUS_CAP: usize = 3;

/// 状态条目
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusEntry {
    #[serde(skip)]
    pub name: String,

    /// 耗时（秒）
    pub latency: f64,

    /// 原始状态码，传输失败时为 0
    pub status: u16,

    /// 能解析为 JSON 时为 JSON，否则为原始字符串
    pub response: Value,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusEntry {
    pub fn new(
        name: impl Into<String>,
        latency: f64,
        status: u16,
        body: &str,
        error: Option<String>,
    ) -> Self {
        let response =
            serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()));

        Self {
            name: name.into(),
            latency,
            status,
            response,
            error,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// 最慢请求和最近错误的快照
///
/// 每次插入时都会立即截断到 [`STATUS_CAP`]。
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusSnapshot {
    /// 按耗时降序
    pub slowest: BTreeMap<String, Vec<StatusEntry>>,

    /// 最近的在前
    pub errors: BTreeMap<String, Vec<StatusEntry>>,
}

impl StatusSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// 合并一条结果
    pub fn apply(&mut self, entry: StatusEntry) {
        let errors = self.errors.entry(entry.name.clone()).or_default();

        if entry.is_error() {
            errors.insert(0, entry);
            errors.truncate(STATUS_CAP);
            return;
        }

        let slowest = self.slowest.entry(entry.name.clone()).or_default();
        let position = slowest
            .iter()
            .position(|existing| existing.latency < entry.latency)
            .unwrap_or(slowest.len());
        slowest.insert(position, entry);
        slowest.truncate(STATUS_CAP);
    }

    pub fn slowest_for(&self, name: &str) -> &[StatusEntry] {
        self.slowest.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn errors_for(&self, name: &str) -> &[StatusEntry] {
        self.errors.get(name).map(Vec::as_slice).unwrap_or_default()
    }
}
