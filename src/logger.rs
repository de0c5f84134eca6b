use std::str::FromStr;

use tracing_subscriber::{EnvFilter, fmt};

/// 日志输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Unsupported log format: {}", s)),
        }
    }
}

/// 初始化日志系统
///
/// RUST_LOG 环境变量优先于 `level` 参数
///
/// 示例:
/// - RUST_LOG=debug chainprobe --targets requests.toml
/// - chainprobe --log-level info --log-format json
pub fn init_logger(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }

    tracing::debug!(level, ?format, "Logger initialized");
}
