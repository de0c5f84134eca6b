use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::config::types::{RequestFile, RequestSpec};
use crate::{ProbeError, Result};

/// 请求文件加载器
pub struct RequestLoader;

impl RequestLoader {
    /// 从指定路径加载请求列表
    ///
    /// 按扩展名选择格式：`.json` 为 JSON 数组，`.yaml`/`.yml` 为 YAML 列表，
    /// 其余按 TOML (`[[request]]`) 解析。
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Vec<RequestSpec>> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        match extension.as_deref() {
            Some("json") => Self::parse_json(&content),
            Some("yaml" | "yml") => Self::parse_yaml(&content),
            _ => Self::parse_toml(&content),
        }
    }

    pub fn parse_toml(content: &str) -> Result<Vec<RequestSpec>> {
        let file: RequestFile = toml::from_str(content)?;
        Self::validate(file.requests)
    }

    pub fn parse_json(content: &str) -> Result<Vec<RequestSpec>> {
        let requests: Vec<RequestSpec> = serde_json::from_str(content)?;
        Self::validate(requests)
    }

    /// 顶层为请求列表，空文件视为空列表
    pub fn parse_yaml(content: &str) -> Result<Vec<RequestSpec>> {
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        let requests: Vec<RequestSpec> = serde_yaml::from_str(content)?;
        Self::validate(requests)
    }

    /// 名称必须非空且唯一
    fn validate(requests: Vec<RequestSpec>) -> Result<Vec<RequestSpec>> {
        let mut seen = HashSet::new();
        for request in &requests {
            if request.name.trim().is_empty() {
                return Err(ProbeError::LoadError(format!(
                    "request with url {} has an empty name",
                    request.url
                )));
            }
            if !seen.insert(request.name.as_str()) {
                return Err(ProbeError::DuplicateName(request.name.clone()));
            }
        }
        Ok(requests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_toml_in_order() {
        let content = r#"
[[request]]
name = "request-1"
url = "http://some-url-1"
method = "GET"

[[request]]
name = "request-2"
url = 'http://some-url-2/{{ fromJson "request-1" "auth.path" }}'
method = "POST"
body = '{ "username": "hello:{{ fromJson "request-1" "auth.name" }}" }'

[request.headers]
Authorization = '{{ fromJson "request-1" "auth.token" }}'

[request.params]
page = "1"

[request.expect]
status_code_re = "2.."
body_re = "checksum"

[request.expect.headers_re]
Content-Type = "json"
"#;

        let requests = RequestLoader::parse_toml(content).unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].name, "request-1");
        assert_eq!(requests[1].name, "request-2");
        assert_eq!(
            requests[1].headers.get("Authorization").map(String::as_str),
            Some(r#"{{ fromJson "request-1" "auth.token" }}"#)
        );
        assert_eq!(requests[1].params.get("page").map(String::as_str), Some("1"));

        let expect = requests[1].expect.as_ref().unwrap();
        assert_eq!(expect.status_code.as_deref(), Some("2.."));
        assert_eq!(
            expect.headers.get("Content-Type").map(String::as_str),
            Some("json")
        );
    }

    #[test]
    fn test_load_json_file() {
        let content = r#"[
            {"name": "An request", "url": "weird url", "method": "Hunk",
             "body": "{\"hested\":\"Ok\"}", "headers": {"key-": "valz"}}
        ]"#;

        let mut temp_file = NamedTempFile::with_suffix(".json").unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let requests = RequestLoader::load_from_path(temp_file.path()).unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].name, "An request");
        assert_eq!(requests[0].url, "weird url");
        assert_eq!(requests[0].method, "Hunk");
        assert_eq!(requests[0].body.as_deref(), Some(r#"{"hested":"Ok"}"#));
        assert_eq!(
            requests[0].headers.get("key-").map(String::as_str),
            Some("valz")
        );
    }

    #[test]
    fn test_load_yaml_file() {
        let content = r#"
- name: login
  url: http://some-url-1/login
  method: POST
  body: '{"user": "dude"}'
  expect:
    status_code_re: "2.."
    headers_re:
      Content-Type: json
- name: profile
  url: 'http://some-url-1/{{ fromJson "login" "auth.path" }}'
  headers:
    Authorization: 'Bearer {{ fromJson "login" "auth.token" }}'
  params:
    page: "2"
"#;

        let mut temp_file = NamedTempFile::with_suffix(".yml").unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let requests = RequestLoader::load_from_path(temp_file.path()).unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].body.as_deref(), Some(r#"{"user": "dude"}"#));
        let expect = requests[0].expect.as_ref().unwrap();
        assert_eq!(expect.status_code.as_deref(), Some("2.."));
        assert_eq!(
            expect.headers.get("Content-Type").map(String::as_str),
            Some("json")
        );

        assert_eq!(requests[1].method, "GET");
        assert_eq!(
            requests[1].url,
            r#"http://some-url-1/{{ fromJson "login" "auth.path" }}"#
        );
        assert_eq!(requests[1].params.get("page").map(String::as_str), Some("2"));
    }

    #[test]
    fn test_malformed_yaml_is_error() {
        let result = RequestLoader::parse_yaml("- name: [unclosed");
        assert!(matches!(result, Err(ProbeError::YamlError(_))));
        assert!(RequestLoader::parse_yaml("").unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let content = r#"
[[request]]
name = "same"
url = "http://a"

[[request]]
name = "same"
url = "http://b"
"#;
        match RequestLoader::parse_toml(content) {
            Err(ProbeError::DuplicateName(name)) => assert_eq!(name, "same"),
            other => panic!("Expected DuplicateName, got {:?}", other.map(|r| r.len())),
        }
    }

    #[test]
    fn test_missing_file_is_error() {
        let result = RequestLoader::load_from_path("/definitely/not/here.toml");
        assert!(matches!(result, Err(ProbeError::IoError(_))));
    }

    #[test]
    fn test_empty_file_is_empty_list() {
        assert!(RequestLoader::parse_toml("").unwrap().is_empty());
    }
}
