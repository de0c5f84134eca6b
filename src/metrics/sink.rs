/// 指标输出能力，注入到各个组件中
///
/// 标签以 `(name, value)` 对的形式传入，顺序即输出顺序。
pub trait MetricsSink: Send + Sync {
    /// 计数器加一
    fn increment_counter(&self, name: &str, labels: &[(&str, &str)]);

    /// 设置 gauge 的当前值
    fn set_gauge(&self, name: &str, labels: &[(&str, &str)], value: f64);

    /// 记录一次耗时（秒）
    fn observe_latency(&self, name: &str, labels: &[(&str, &str)], seconds: f64);

    /// 预先登记一个值为 0 的计数器，已存在时不变
    fn declare_counter(&self, _name: &str, _labels: &[(&str, &str)]) {}

    /// 预先登记一个空的耗时 summary，已存在时不变
    fn declare_latency(&self, _name: &str, _labels: &[(&str, &str)]) {}
}

/// 丢弃所有指标
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn increment_counter(&self, _name: &str, _labels: &[(&str, &str)]) {}

    fn set_gauge(&self, _name: &str, _labels: &[(&str, &str)], _value: f64) {}

    fn observe_latency(&self, _name: &str, _labels: &[(&str, &str)], _seconds: f64) {}
}

/// 指标名称
pub mod names {
    pub const ERRORS_TOTAL: &str = "chainprobe_errors_total";
    pub const REQUESTS_SENT_TOTAL: &str = "chainprobe_requests_sent_total";
    pub const REQUEST_STATUS_TOTAL: &str = "chainprobe_request_status_total";
    pub const REQUEST_LATENCY_SECONDS: &str = "chainprobe_request_latency_seconds";
    pub const EXPECTED_RESPONSE_TOTAL: &str = "chainprobe_expected_response_total";
    pub const UNEXPECTED_RESPONSE_TOTAL: &str = "chainprobe_unexpected_response_total";
    pub const PASSES_TOTAL: &str = "chainprobe_passes_total";
    pub const RUNTIME: &str = "chainprobe_runtime";

    /// HELP 文本
    pub fn describe(name: &str) -> &'static str {
        match name {
            ERRORS_TOTAL => "Total number of internal errors by kind.",
            REQUESTS_SENT_TOTAL => "Total number of requests attempted.",
            REQUEST_STATUS_TOTAL => "Total requests by status bucket.",
            REQUEST_LATENCY_SECONDS => "HTTP request latency in seconds.",
            EXPECTED_RESPONSE_TOTAL => "Total response parts matching their expectation.",
            UNEXPECTED_RESPONSE_TOTAL => "Total response parts not matching their expectation.",
            PASSES_TOTAL => "Total passes started over the request sequence.",
            RUNTIME => "Start time of the prober, labelled with its parameters.",
            _ => "",
        }
    }
}

/// `chainprobe_errors_total` 的 `error` 标签取值
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    TargetsFile,
    UrlParse,
    TemplateParse,
    TemplateExecute,
    TemplateMissingEntry,
    ExpectReCompile,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::TargetsFile => "targets_file",
            ErrorKind::UrlParse => "url_parse",
            ErrorKind::TemplateParse => "template_parse",
            ErrorKind::TemplateExecute => "template_execute",
            ErrorKind::TemplateMissingEntry => "template_missing_entry",
            ErrorKind::ExpectReCompile => "expect_re_compile",
        }
    }
}

/// 记录一次内部错误
pub fn record_error(sink: &dyn MetricsSink, kind: ErrorKind) {
    sink.increment_counter(names::ERRORS_TOTAL, &[("error", kind.as_str())]);
}
