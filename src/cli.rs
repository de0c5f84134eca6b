use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use chainprobe::logger::LogFormat;
use chainprobe::runner::{Repeat, SchedulerConfig};

#[derive(Parser, Debug)]
#[command(author, version, about = "按顺序重复执行一组可串联的 HTTP 请求并暴露状态和指标", long_about = None)]
pub struct Cli {
    /// 状态和指标接口的监听地址
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// 状态和指标接口的端口
    #[arg(long, default_value_t = 9115)]
    pub port: u16,

    /// 并发 worker 数
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub concurrency: u32,

    /// 两轮之间的间隔（秒）
    #[arg(long, default_value_t = 1)]
    pub sleep: u64,

    /// 首轮之后重复的次数，-1 表示无限
    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    pub repeat: i64,

    /// 请求列表文件（TOML，或以 .json 结尾的 JSON）
    #[arg(long, default_value = "targets.toml")]
    pub targets: PathBuf,

    /// 日志级别，RUST_LOG 优先
    #[arg(long, default_value = "warn")]
    pub log_level: String,

    /// 日志格式：text 或 json
    #[arg(long, default_value = "text")]
    pub log_format: LogFormat,
}

impl Cli {
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            workers: self.concurrency as usize,
            sleep: Duration::from_secs(self.sleep),
            repeat: Repeat::from_flag(self.repeat),
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
