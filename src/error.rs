use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("加载错误: {0}")]
    LoadError(String),

    #[error("无效的 HTTP 方法: {0}")]
    InvalidMethod(String),

    #[error("无效的 Header: {0}")]
    InvalidHeader(String),

    #[error("重复的请求名称: {0}")]
    DuplicateName(String),

    #[error("HTTP 请求失败: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO 错误: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON 解析错误: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("YAML 解析错误: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("TOML 解析错误: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("URL 解析错误: {0}")]
    UrlParseError(#[from] url::ParseError),
}

/// Result type for chainprobe crate
pub type Result<T> = std::result::Result<T, ProbeError>;
