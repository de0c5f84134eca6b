use std::sync::Arc;

use regex::Regex;
use reqwest::header::HeaderMap;
use tracing::{debug, error};

use crate::expect::types::{Expectation, ExpectationFailure, Part, PartFailure};
use crate::metrics::{ErrorKind, MetricsSink, names, record_error};

/// Body 在错误信息中最多保留的字符数
const BODY_PREVIEW_CHARS: usize = 120;

/// 按正则校验响应
///
/// 结果只用于观测：不影响状态分类，也不影响历史记录。
pub struct ExpectationMatcher {
    metrics: Arc<dyn MetricsSink>,
}

impl ExpectationMatcher {
    pub fn new(metrics: Arc<dyn MetricsSink>) -> Self {
        Self { metrics }
    }

    /// 分别校验状态码、Header 和 Body，任何一个启用的部分失败即返回错误
    pub fn evaluate(
        &self,
        name: &str,
        expectation: &Expectation,
        status: u16,
        headers: &HeaderMap,
        body: &str,
    ) -> Result<(), ExpectationFailure> {
        let mut failures = Vec::new();

        if let Some(pattern) = enabled(expectation.status_code.as_deref())
            && let Err(f) = self.check(
                name,
                Part::StatusCode,
                Part::StatusCode.as_str(),
                pattern,
                &status.to_string(),
            )
        {
            failures.push(f);
        }

        for (header, pattern) in &expectation.headers {
            let Some(pattern) = enabled(Some(pattern.as_str())) else {
                continue;
            };
            let value = headers
                .get(header.as_str())
                .and_then(|v| v.to_str().ok())
                .unwrap_or("");
            let target = format!("header {}", header);
            if let Err(f) = self.check(name, Part::Headers, &target, pattern, value) {
                failures.push(f);
            }
        }

        if let Some(pattern) = enabled(expectation.body.as_deref())
            && let Err(f) = self.check(name, Part::Body, Part::Body.as_str(), pattern, body)
        {
            failures.push(f);
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ExpectationFailure { failures })
        }
    }

    fn check(
        &self,
        name: &str,
        part: Part,
        target: &str,
        pattern: &str,
        actual: &str,
    ) -> Result<(), PartFailure> {
        let re = match Regex::new(pattern) {
            Ok(re) => re,
            Err(e) => {
                record_error(self.metrics.as_ref(), ErrorKind::ExpectReCompile);
                error!(
                    name,
                    regexp = pattern,
                    "Could not compile regular expression for expected evaluation: {}",
                    e
                );
                return Err(PartFailure::InvalidPattern {
                    part,
                    target: target.to_string(),
                    pattern: pattern.to_string(),
                    reason: e.to_string(),
                });
            }
        };

        let labels = [("name", name), ("part", part.as_str())];
        if re.is_match(actual) {
            self.metrics
                .increment_counter(names::EXPECTED_RESPONSE_TOTAL, &labels);
            Ok(())
        } else {
            self.metrics
                .increment_counter(names::UNEXPECTED_RESPONSE_TOTAL, &labels);
            debug!(name, part = part.as_str(), regexp = pattern, "Response did not match");
            Err(PartFailure::Mismatch {
                part,
                target: target.to_string(),
                pattern: pattern.to_string(),
                actual: preview(actual),
            })
        }
    }
}

fn enabled(pattern: Option<&str>) -> Option<&str> {
    pattern.filter(|p| !p.is_empty())
}

fn preview(actual: &str) -> String {
    if actual.chars().count() <= BODY_PREVIEW_CHARS {
        actual.to_string()
    } else {
        let head: String = actual.chars().take(BODY_PREVIEW_CHARS).collect();
        format!("{}...", head)
    }
}
