use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use url::form_urlencoded;

use crate::{ProbeError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
    /// 其他合法的 HTTP token，原样发送
    Other(String),
}

impl FromStr for Method {
    type Err = ProbeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            "PATCH" => Ok(Method::Patch),
            "HEAD" => Ok(Method::Head),
            "OPTIONS" => Ok(Method::Options),
            _ => reqwest::Method::from_bytes(s.as_bytes())
                .map(|_| Method::Other(s.to_string()))
                .map_err(|_| ProbeError::InvalidMethod(s.to_string())),
        }
    }
}

impl Method {
    pub fn parse(s: &str) -> Result<Self> {
        s.parse()
    }

    pub fn as_str(&self) -> &str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
            Method::Other(token) => token,
        }
    }

    pub fn to_reqwest(&self) -> Result<reqwest::Method> {
        match self {
            Method::Get => Ok(reqwest::Method::GET),
            Method::Post => Ok(reqwest::Method::POST),
            Method::Put => Ok(reqwest::Method::PUT),
            Method::Delete => Ok(reqwest::Method::DELETE),
            Method::Patch => Ok(reqwest::Method::PATCH),
            Method::Head => Ok(reqwest::Method::HEAD),
            Method::Options => Ok(reqwest::Method::OPTIONS),
            Method::Other(token) => reqwest::Method::from_bytes(token.as_bytes())
                .map_err(|_| ProbeError::InvalidMethod(token.clone())),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 粗粒度的状态分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StatusBucket {
    /// 400 以下（包括 1xx 和 3xx）
    #[serde(rename = "2xx")]
    Success,
    #[serde(rename = "4xx")]
    ClientError,
    #[serde(rename = "5xx")]
    ServerError,
    /// 传输层失败，没有完成 HTTP 交换
    #[serde(rename = "error")]
    Error,
}

impl StatusBucket {
    pub const ALL: [StatusBucket; 4] = [
        StatusBucket::Success,
        StatusBucket::ClientError,
        StatusBucket::ServerError,
        StatusBucket::Error,
    ];

    pub fn from_code(code: u16) -> Self {
        if code < 400 {
            StatusBucket::Success
        } else if code < 500 {
            StatusBucket::ClientError
        } else {
            StatusBucket::ServerError
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusBucket::Success => "2xx",
            StatusBucket::ClientError => "4xx",
            StatusBucket::ServerError => "5xx",
            StatusBucket::Error => "error",
        }
    }
}

impl fmt::Display for StatusBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 把 query 参数合并进 URL
///
/// URL 中已有的参数会保留；同名参数被新值替换，`params` 内部重名时后者生效。
/// 结果按键名排序并做 percent-encoding。没有参数时原样返回。
pub fn merge_query(raw: &str, params: &[(String, String)]) -> Result<String> {
    let mut url = url::Url::parse(raw)?;
    if params.is_empty() {
        return Ok(raw.to_string());
    }

    let mut overrides: Vec<(String, String)> = Vec::with_capacity(params.len());
    for (key, value) in params {
        match overrides.iter_mut().find(|(existing, _)| existing == key) {
            Some(entry) => entry.1 = value.clone(),
            None => overrides.push((key.clone(), value.clone())),
        }
    }

    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !overrides.iter().any(|(name, _)| name == k))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    pairs.extend(overrides);
    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish();
    url.set_query(Some(&query));

    Ok(url.to_string())
}
