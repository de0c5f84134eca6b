use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use crate::metrics::{ErrorKind, MetricsSink, record_error};
use crate::template::{EvalContext, Template, TemplateError};

/// 每个请求名称最近一次响应的 body
///
/// 每个名称只保留一代数据：`record` 直接覆盖旧值，不做合并，也不保留历史版本。
/// 每个 worker 独占一个实例，不跨 worker 共享。
pub struct ResponseHistory {
    records: HashMap<String, String>,
    metrics: Arc<dyn MetricsSink>,
}

impl ResponseHistory {
    pub fn new(metrics: Arc<dyn MetricsSink>) -> Self {
        Self {
            records: HashMap::new(),
            metrics,
        }
    }

    /// 记录 `name` 的最新响应，替换之前的值
    pub fn record(&mut self, name: impl Into<String>, body: impl Into<String>) {
        self.records.insert(name.into(), body.into());
    }

    /// 丢弃全部记录，每一轮开始时调用
    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.records.get(name).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 对模板求值
    ///
    /// 这是一个 Best-effort 操作：解析或执行失败时记录指标和警告，
    /// 并原样返回输入文本，绝不向调用方报错。
    pub fn evaluate(&self, input: &str) -> String {
        let ctx = EvalContext {
            records: &self.records,
            metrics: self.metrics.as_ref(),
        };

        match Template::parse(input).and_then(|template| template.render(&ctx)) {
            Ok(output) => output,
            Err(e) => {
                let kind = match e {
                    TemplateError::Parse(_) => ErrorKind::TemplateParse,
                    TemplateError::Execute(_) => ErrorKind::TemplateExecute,
                };
                record_error(self.metrics.as_ref(), kind);
                warn!(template = input, "Falling back to literal text: {}", e);
                input.to_string()
            }
        }
    }
}
