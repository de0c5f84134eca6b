use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, warn};

use crate::Result;
use crate::config::RequestSpec;
use crate::expect::ExpectationMatcher;
use crate::history::ResponseHistory;
use crate::http::{Client, Request, merge_query};
use crate::metrics::{ErrorKind, MetricsSink, names, record_error};
use crate::runner::types::ResponseResult;

/// 执行单个请求：模板替换、发送、分类、校验
pub struct RequestExecutor {
    client: Client,
    matcher: ExpectationMatcher,
    metrics: Arc<dyn MetricsSink>,
}

impl RequestExecutor {
    pub fn new(client: Client, metrics: Arc<dyn MetricsSink>) -> Self {
        Self {
            client,
            matcher: ExpectationMatcher::new(metrics.clone()),
            metrics,
        }
    }

    /// 执行请求，永远返回一个结果
    ///
    /// 请求无法构建或传输失败时结果的分类为 `error`，此时不做期望校验。
    pub async fn execute(&self, spec: &RequestSpec, history: &ResponseHistory) -> ResponseResult {
        let url = self.resolve_url(spec, history);

        let request = match build_request(spec, history, &url) {
            Ok(request) => request,
            Err(e) => {
                error!(name = %spec.name, url = %url, "Failed to build request: {}", e);
                let result = ResponseResult::transport_error(
                    &spec.name,
                    format!("Failed to build request: {}", e),
                    Duration::ZERO,
                );
                self.observe(&result);
                return result;
            }
        };

        self.metrics
            .increment_counter(names::REQUESTS_SENT_TOTAL, &[("name", spec.name.as_str())]);
        debug!(name = %spec.name, method = %request.method, url = %request.url, "Sending request");

        let start = Instant::now();
        let result = match self.client.execute(request).await {
            Ok(response) => {
                if response.is_error() {
                    warn!(name = %spec.name, status = response.status, "Request returned error status");
                }

                let failure = spec.expect.as_ref().and_then(|expectation| {
                    self.matcher
                        .evaluate(
                            &spec.name,
                            expectation,
                            response.status,
                            &response.headers,
                            &response.body,
                        )
                        .err()
                });
                if let Some(failure) = &failure {
                    warn!(name = %spec.name, "Unexpected response: {}", failure);
                }

                let mut result = ResponseResult::completed(&spec.name, response);
                result.expectation_failure = failure;
                result
            }
            Err(e) => {
                error!(name = %spec.name, url = %url, "Request failed: {}", e);
                ResponseResult::transport_error(
                    &spec.name,
                    format!("Request failed: {}", e),
                    start.elapsed(),
                )
            }
        };

        self.observe(&result);
        result
    }

    /// URL 和 query 参数的模板替换
    ///
    /// URL 无法解析时记录指标，保留替换后的原始文本，由发送阶段报错。
    fn resolve_url(&self, spec: &RequestSpec, history: &ResponseHistory) -> String {
        let raw = history.evaluate(&spec.url);
        let params: Vec<(String, String)> = spec
            .params
            .iter()
            .map(|(key, value)| (history.evaluate(key), history.evaluate(value)))
            .collect();

        match merge_query(&raw, &params) {
            Ok(url) => url,
            Err(e) => {
                record_error(self.metrics.as_ref(), ErrorKind::UrlParse);
                warn!(name = %spec.name, url = %raw, "Failed to parse URL: {}", e);
                raw
            }
        }
    }

    fn observe(&self, result: &ResponseResult) {
        let labels = [("name", result.name.as_str()), ("status", result.bucket.as_str())];
        self.metrics
            .increment_counter(names::REQUEST_STATUS_TOTAL, &labels);
        self.metrics.observe_latency(
            names::REQUEST_LATENCY_SECONDS,
            &labels,
            result.latency_secs(),
        );
    }
}

/// 方法不做模板替换；Header 的名称和值分别替换
fn build_request(spec: &RequestSpec, history: &ResponseHistory, url: &str) -> Result<Request> {
    let mut request = Request::new(&spec.method, url)?;

    for (key, value) in &spec.headers {
        request = request.with_header(&history.evaluate(key), &history.evaluate(value))?;
    }

    if let Some(body) = spec.body_template() {
        request = request.with_body(history.evaluate(body));
    }

    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::StatusBucket;
    use crate::metrics::MetricsRegistry;

    fn setup() -> (RequestExecutor, ResponseHistory, Arc<MetricsRegistry>) {
        let metrics = Arc::new(MetricsRegistry::new());
        let executor = RequestExecutor::new(Client::new(), metrics.clone());
        let history = ResponseHistory::new(metrics.clone());
        (executor, history, metrics)
    }

    #[tokio::test]
    async fn test_connection_refused_is_error_bucket() {
        let (executor, history, metrics) = setup();
        let spec = RequestSpec::new("down", "GET", "http://127.0.0.1:1/health");

        let result = executor.execute(&spec, &history).await;

        assert_eq!(result.bucket, StatusBucket::Error);
        assert!(result.is_transport_error());
        assert!(result.expectation_failure.is_none());
        assert_eq!(
            metrics.counter(
                names::REQUEST_STATUS_TOTAL,
                &[("name", "down"), ("status", "error")]
            ),
            1.0
        );
        assert_eq!(
            metrics.counter(names::REQUESTS_SENT_TOTAL, &[("name", "down")]),
            1.0
        );
    }

    #[tokio::test]
    async fn test_invalid_method_is_never_sent() {
        let (executor, history, metrics) = setup();
        let spec = RequestSpec::new("bad", "NOT A METHOD", "http://127.0.0.1:1/");

        let result = executor.execute(&spec, &history).await;

        assert_eq!(result.bucket, StatusBucket::Error);
        assert!(result.error.as_deref().unwrap().contains("Failed to build request"));
        assert_eq!(
            metrics.counter(names::REQUESTS_SENT_TOTAL, &[("name", "bad")]),
            0.0
        );
        assert!(
            metrics
                .summary(
                    names::REQUEST_LATENCY_SECONDS,
                    &[("name", "bad"), ("status", "error")]
                )
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_unparseable_url_counts_url_parse_error() {
        let (executor, history, metrics) = setup();
        let spec = RequestSpec::new("rel", "GET", "not a url").with_param("a", "1");

        let result = executor.execute(&spec, &history).await;

        assert_eq!(result.bucket, StatusBucket::Error);
        assert_eq!(
            metrics.counter(names::ERRORS_TOTAL, &[("error", "url_parse")]),
            1.0
        );
    }
}
