//! Prometheus 文本格式输出

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::metrics::registry::{MetricKey, MetricsRegistry};
use crate::metrics::sink::names;

/// 渲染注册表中的全部指标
///
/// 按指标名分组，每组前面输出一次 HELP 和 TYPE 行。
pub fn render_prometheus(registry: &MetricsRegistry) -> String {
    let state = registry.lock();
    let mut out = String::new();

    render_group(&mut out, "counter", &state.counters);
    render_group(&mut out, "gauge", &state.gauges);

    let mut last_name: Option<&str> = None;
    for (key, summary) in &state.summaries {
        if last_name != Some(key.name.as_str()) {
            write_header(&mut out, &key.name, "summary");
            last_name = Some(key.name.as_str());
        }
        let labels = format_labels(&key.labels);
        let _ = writeln!(out, "{}_sum{} {}", key.name, labels, summary.sum);
        let _ = writeln!(out, "{}_count{} {}", key.name, labels, summary.count);
    }

    out
}

fn render_group(out: &mut String, kind: &str, values: &BTreeMap<MetricKey, f64>) {
    let mut last_name: Option<&str> = None;
    for (key, value) in values {
        if last_name != Some(key.name.as_str()) {
            write_header(out, &key.name, kind);
            last_name = Some(key.name.as_str());
        }
        let _ = writeln!(out, "{}{} {}", key.name, format_labels(&key.labels), value);
    }
}

fn write_header(out: &mut String, name: &str, kind: &str) {
    let help = names::describe(name);
    if !help.is_empty() {
        let _ = writeln!(out, "# HELP {} {}", name, help);
    }
    let _ = writeln!(out, "# TYPE {} {}", name, kind);
}

fn format_labels(labels: &[(String, String)]) -> String {
    if labels.is_empty() {
        return String::new();
    }

    let parts: Vec<String> = labels
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label_value(v)))
        .collect();
    format!("{{{}}}", parts.join(","))
}

fn escape_label_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}
