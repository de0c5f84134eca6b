use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::metrics::sink::MetricsSink;

/// 指标名 + 标签
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct MetricKey {
    pub name: String,
    pub labels: Vec<(String, String)>,
}

impl MetricKey {
    fn new(name: &str, labels: &[(&str, &str)]) -> Self {
        Self {
            name: name.to_string(),
            labels: labels
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

/// Summary 只保留 count 和 sum
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Summary {
    pub count: u64,
    pub sum: f64,
}

#[derive(Debug, Default)]
pub(crate) struct RegistryState {
    pub(crate) counters: BTreeMap<MetricKey, f64>,
    pub(crate) gauges: BTreeMap<MetricKey, f64>,
    pub(crate) summaries: BTreeMap<MetricKey, Summary>,
}

/// 进程内指标注册表，可渲染为 Prometheus 文本格式
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    state: Mutex<RegistryState>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, RegistryState> {
        // 写入方不会在持锁时 panic，中毒后的数据依然可用
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 读取计数器，不存在时为 0
    pub fn counter(&self, name: &str, labels: &[(&str, &str)]) -> f64 {
        self.lock()
            .counters
            .get(&MetricKey::new(name, labels))
            .copied()
            .unwrap_or(0.0)
    }

    /// 名称相同的所有计数器之和（忽略标签）
    pub fn counter_total(&self, name: &str) -> f64 {
        self.lock()
            .counters
            .iter()
            .filter(|(key, _)| key.name == name)
            .map(|(_, value)| value)
            .sum()
    }

    pub fn gauge(&self, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
        self.lock()
            .gauges
            .get(&MetricKey::new(name, labels))
            .copied()
    }

    pub fn summary(&self, name: &str, labels: &[(&str, &str)]) -> Option<Summary> {
        self.lock()
            .summaries
            .get(&MetricKey::new(name, labels))
            .copied()
    }
}

impl MetricsSink for MetricsRegistry {
    fn increment_counter(&self, name: &str, labels: &[(&str, &str)]) {
        *self
            .lock()
            .counters
            .entry(MetricKey::new(name, labels))
            .or_insert(0.0) += 1.0;
    }

    fn set_gauge(&self, name: &str, labels: &[(&str, &str)], value: f64) {
        self.lock()
            .gauges
            .insert(MetricKey::new(name, labels), value);
    }

    fn observe_latency(&self, name: &str, labels: &[(&str, &str)], seconds: f64) {
        let mut state = self.lock();
        let summary = state
            .summaries
            .entry(MetricKey::new(name, labels))
            .or_default();
        summary.count += 1;
        summary.sum += seconds;
    }

    fn declare_counter(&self, name: &str, labels: &[(&str, &str)]) {
        self.lock()
            .counters
            .entry(MetricKey::new(name, labels))
            .or_insert(0.0);
    }

    fn declare_latency(&self, name: &str, labels: &[(&str, &str)]) {
        self.lock()
            .summaries
            .entry(MetricKey::new(name, labels))
            .or_default();
    }
}
