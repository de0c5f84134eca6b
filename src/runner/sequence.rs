use std::path::Path;
use std::sync::Arc;

use tracing::{error, info};

use crate::config::{RequestLoader, RequestSpec};
use crate::metrics::{ErrorKind, MetricsSink, record_error};

/// 不可变的请求列表加一个游标
///
/// 列表通过 `Arc` 在 worker 之间共享，游标属于每个实例自己。
/// 克隆得到的是同一份列表和一个独立的游标。
#[derive(Debug, Clone)]
pub struct RequestSequence {
    requests: Arc<[RequestSpec]>,
    index: usize,
}

impl RequestSequence {
    pub fn new(requests: Vec<RequestSpec>) -> Self {
        Self {
            requests: requests.into(),
            index: 0,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// 加载请求文件，失败时记录指标和日志并返回空列表
    pub fn load_or_empty<P: AsRef<Path>>(path: P, metrics: &dyn MetricsSink) -> Self {
        let path = path.as_ref();
        match RequestLoader::load_from_path(path) {
            Ok(requests) => {
                info!(targets = %path.display(), count = requests.len(), "Loaded request sequence");
                Self::new(requests)
            }
            Err(e) => {
                record_error(metrics, ErrorKind::TargetsFile);
                error!(targets = %path.display(), "Failed to load request sequence: {}", e);
                Self::empty()
            }
        }
    }

    /// 把游标重置到开头，返回第一个请求
    pub fn first(&mut self) -> Option<&RequestSpec> {
        self.index = 0;
        self.requests.first()
    }

    /// 游标前进一位，越过末尾后返回 None，不会自动回绕
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<&RequestSpec> {
        if self.index < self.requests.len() {
            self.index += 1;
        }
        self.requests.get(self.index)
    }

    /// 按声明顺序列出请求名称，不移动游标
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.requests.iter().map(|r| r.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}
