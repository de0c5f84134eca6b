use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::http::{Client, StatusBucket};
use crate::metrics::{MetricsSink, names};
use crate::runner::executor::RequestExecutor;
use crate::runner::pass::Runner;
use crate::runner::sequence::RequestSequence;
use crate::status::StatusAggregator;

/// 每个 worker 的重复次数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repeat {
    /// 一直运行，直到进程退出
    Infinite,
    /// 首轮之后再重复 N 轮，共 N + 1 轮
    Times(u32),
}

impl Repeat {
    /// 命令行取值：小于等于 -1 表示无限
    pub fn from_flag(value: i64) -> Self {
        if value <= -1 {
            Repeat::Infinite
        } else {
            Repeat::Times(u32::try_from(value).unwrap_or(u32::MAX))
        }
    }

    /// 已完成 `passes` 轮之后是否应当停止
    pub fn is_exhausted(&self, passes: u64) -> bool {
        match self {
            Repeat::Infinite => false,
            Repeat::Times(n) => passes > u64::from(*n),
        }
    }

    pub fn as_flag(&self) -> i64 {
        match self {
            Repeat::Infinite => -1,
            Repeat::Times(n) => i64::from(*n),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// 并发 worker 数，至少为 1
    pub workers: usize,
    /// 两轮之间的间隔
    pub sleep: Duration,
    pub repeat: Repeat,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            sleep: Duration::from_secs(1),
            repeat: Repeat::Infinite,
        }
    }
}

/// 启动 N 个 worker，共享只读的请求列表，各自持有独立的历史记录
pub struct Scheduler {
    config: SchedulerConfig,
    sequence: RequestSequence,
    client: Client,
    status: StatusAggregator,
    metrics: Arc<dyn MetricsSink>,
}

impl Scheduler {
    pub fn new(
        config: SchedulerConfig,
        sequence: RequestSequence,
        status: StatusAggregator,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            config,
            sequence,
            client: Client::new(),
            status,
            metrics,
        }
    }

    /// 运行直到第一个 worker 用完重复次数
    ///
    /// 返回该 worker 的编号；其余 worker 会被直接中止，不等待当前一轮结束。
    /// 重复次数为无限时不会返回。
    pub async fn run(self) -> Option<usize> {
        let workers = self.config.workers.max(1);
        self.record_runtime(workers);
        self.declare_series();

        let mut tasks = JoinSet::new();
        for worker in 0..workers {
            let runner = Runner::new(
                worker,
                self.sequence.clone(),
                RequestExecutor::new(self.client.clone(), self.metrics.clone()),
                self.status.clone(),
                self.metrics.clone(),
            );
            tasks.spawn(worker_loop(runner, self.config.sleep, self.config.repeat));
        }

        info!(
            workers,
            targets = self.sequence.len(),
            repeat = self.config.repeat.as_flag(),
            "Scheduler started"
        );

        let mut finished = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(worker) => {
                    info!(worker, "Worker reached its repeat limit, shutting down");
                    finished = Some(worker);
                    break;
                }
                Err(e) if e.is_panic() => error!("Worker panicked: {}", e),
                Err(e) => debug!("Worker cancelled: {}", e),
            }
        }

        tasks.shutdown().await;
        finished
    }

    fn record_runtime(&self, workers: usize) {
        let targets = self.sequence.len().to_string();
        let concurrency = workers.to_string();
        let sleep = self.config.sleep.as_secs().to_string();
        let repeat = self.config.repeat.as_flag().to_string();

        self.metrics.set_gauge(
            names::RUNTIME,
            &[
                ("targets_length", targets.as_str()),
                ("concurrency", concurrency.as_str()),
                ("sleep", sleep.as_str()),
                ("repeat", repeat.as_str()),
            ],
            Utc::now().timestamp() as f64,
        );
    }

    /// 为每个请求名称和状态分类登记零值序列，`/metrics` 从第一次抓取起就是完整的
    fn declare_series(&self) {
        for name in self.sequence.names() {
            for bucket in StatusBucket::ALL {
                let labels = [("name", name), ("status", bucket.as_str())];
                self.metrics
                    .declare_counter(names::REQUEST_STATUS_TOTAL, &labels);
                self.metrics
                    .declare_latency(names::REQUEST_LATENCY_SECONDS, &labels);
            }
        }
    }
}

async fn worker_loop(mut runner: Runner, sleep: Duration, repeat: Repeat) -> usize {
    let mut passes: u64 = 0;
    loop {
        runner.run_pass().await;
        passes += 1;

        if repeat.is_exhausted(passes) {
            return runner.worker();
        }

        tokio::time::sleep(sleep).await;
    }
}
