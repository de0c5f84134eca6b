use std::sync::Arc;

use tokio::sync::{RwLock, mpsc, oneshot};
use tracing::{debug, warn};

use crate::status::model::{StatusEntry, StatusSnapshot};

/// 队列默认容量
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

enum Message {
    Record(StatusEntry),
    Flush(oneshot::Sender<()>),
}

/// 多个 worker 共享的状态汇总
///
/// 写入方只往有界队列里发送结果，由唯一的消费任务修改快照。
/// 队列满时 `record` 会等待（背压），不会丢弃结果。
#[derive(Clone)]
pub struct StatusAggregator {
    tx: mpsc::Sender<Message>,
    state: Arc<RwLock<StatusSnapshot>>,
}

impl StatusAggregator {
    /// 创建并启动消费任务，必须在 tokio 运行时内调用
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_QUEUE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let state = Arc::new(RwLock::new(StatusSnapshot::new()));

        tokio::spawn(consume(rx, state.clone()));

        Self { tx, state }
    }

    /// 提交一条结果
    pub async fn record(
        &self,
        name: &str,
        latency: f64,
        status: u16,
        body: &str,
        error: Option<String>,
    ) {
        self.submit(StatusEntry::new(name, latency, status, body, error))
            .await;
    }

    pub async fn submit(&self, entry: StatusEntry) {
        if self.tx.send(Message::Record(entry)).await.is_err() {
            warn!("Status consumer stopped, dropping result");
        }
    }

    /// 等待此前提交的结果全部被消费
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(Message::Flush(ack_tx)).await.is_err() {
            return;
        }
        let _ = ack_rx.await;
    }

    /// 当前快照的一致副本
    pub async fn snapshot(&self) -> StatusSnapshot {
        self.state.read().await.clone()
    }
}

impl Default for StatusAggregator {
    fn default() -> Self {
        Self::new()
    }
}

async fn consume(mut rx: mpsc::Receiver<Message>, state: Arc<RwLock<StatusSnapshot>>) {
    while let Some(message) = rx.recv().await {
        match message {
            Message::Record(entry) => state.write().await.apply(entry),
            Message::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
    debug!("Status consumer finished");
}
