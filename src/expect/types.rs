use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// 响应期望：状态码、Header、Body 的正则
///
/// 缺省或空字符串的正则视为总是满足，不产生任何指标。
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Expectation {
    #[serde(default, rename = "status_code_re", skip_serializing_if = "Option::is_none")]
    pub status_code: Option<String>,

    #[serde(default, rename = "headers_re", skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,

    #[serde(default, rename = "body_re", skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl Expectation {
    pub fn status_code(pattern: impl Into<String>) -> Self {
        Self {
            status_code: Some(pattern.into()),
            ..Self::default()
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.headers.insert(name.into(), pattern.into());
        self
    }

    pub fn with_body(mut self, pattern: impl Into<String>) -> Self {
        self.body = Some(pattern.into());
        self
    }

    /// 没有任何启用的部分
    pub fn is_empty(&self) -> bool {
        self.status_code.as_deref().is_none_or(str::is_empty)
            && self.headers.is_empty()
            && self.body.as_deref().is_none_or(str::is_empty)
    }
}

/// 被校验的响应部分，对应指标的 `part` 标签
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Part {
    StatusCode,
    Headers,
    Body,
}

impl Part {
    pub fn as_str(&self) -> &'static str {
        match self {
            Part::StatusCode => "status_code",
            Part::Headers => "headers",
            Part::Body => "body",
        }
    }
}

impl fmt::Display for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 单个部分的失败原因
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PartFailure {
    #[error("{target} {actual:?} did not match {pattern}")]
    Mismatch {
        part: Part,
        target: String,
        pattern: String,
        actual: String,
    },

    #[error("{target} pattern {pattern} does not compile: {reason}")]
    InvalidPattern {
        part: Part,
        target: String,
        pattern: String,
        reason: String,
    },
}

impl PartFailure {
    pub fn part(&self) -> Part {
        match self {
            PartFailure::Mismatch { part, .. } | PartFailure::InvalidPattern { part, .. } => *part,
        }
    }

    pub fn is_invalid_pattern(&self) -> bool {
        matches!(self, PartFailure::InvalidPattern { .. })
    }
}

/// 一次响应校验中所有失败的部分
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", describe(.failures))]
pub struct ExpectationFailure {
    pub failures: Vec<PartFailure>,
}

fn describe(failures: &[PartFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
