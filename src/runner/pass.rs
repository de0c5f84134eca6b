use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use crate::history::ResponseHistory;
use crate::metrics::{MetricsSink, names};
use crate::runner::executor::RequestExecutor;
use crate::runner::sequence::RequestSequence;
use crate::runner::types::ResponseResult;
use crate::status::StatusAggregator;

/// 单个 worker 的执行器
///
/// 按声明顺序逐个执行请求。后面的请求可以引用同一轮中前面请求的响应，
/// 因此一轮之内严格串行。
pub struct Runner {
    worker: usize,
    sequence: RequestSequence,
    history: ResponseHistory,
    executor: RequestExecutor,
    status: StatusAggregator,
    metrics: Arc<dyn MetricsSink>,
}

impl Runner {
    pub fn new(
        worker: usize,
        sequence: RequestSequence,
        executor: RequestExecutor,
        status: StatusAggregator,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            worker,
            sequence,
            history: ResponseHistory::new(metrics.clone()),
            executor,
            status,
            metrics,
        }
    }

    pub fn worker(&self) -> usize {
        self.worker
    }

    pub fn history(&self) -> &ResponseHistory {
        &self.history
    }

    /// 执行一整轮
    ///
    /// 每轮从空的历史开始，模板只能引用本轮已成功收到的响应。
    /// 传输失败的请求不写入历史；4xx/5xx 仍然写入。
    pub async fn run_pass(&mut self) -> Vec<ResponseResult> {
        let worker = self.worker.to_string();
        self.metrics
            .increment_counter(names::PASSES_TOTAL, &[("worker", worker.as_str())]);
        self.history.clear();

        let start = Instant::now();
        let mut results = Vec::with_capacity(self.sequence.len());

        let mut current = self.sequence.first();
        while let Some(spec) = current {
            let result = self.executor.execute(spec, &self.history).await;

            if !result.is_transport_error() {
                self.history.record(spec.name.as_str(), result.body.as_str());
            }

            self.status
                .record(
                    &result.name,
                    result.latency_secs(),
                    result.status_code,
                    &result.body,
                    result.error.clone(),
                )
                .await;

            results.push(result);
            current = self.sequence.next();
        }

        let failed = results.iter().filter(|r| r.is_transport_error()).count();
        info!(
            worker = self.worker,
            requests = results.len(),
            failed,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Pass completed"
        );

        results
    }
}
