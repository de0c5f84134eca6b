use std::fs;
use std::sync::Arc;

use chainprobe::http::{Client, StatusBucket};
use chainprobe::metrics::{MetricsRegistry, names};
use chainprobe::runner::{RequestExecutor, RequestSequence, Runner};
use chainprobe::status::StatusAggregator;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TARGETS: &str = r#"
[[request]]
name = "A"
method = "POST"
url = 'MOCK/login'
body = '{"user": "dude"}'

[request.expect]
status_code_re = '^2\d\d$'
body_re = 'token'

[[request]]
name = "B"
url = 'MOCK/{{ fromJson "A" "auth.path" }}'

[request.headers]
Authorization = 'Bearer {{ fromJson "A" "auth.token" }}'

[[request]]
name = "C"
method = "post"
url = 'MOCK/items/{{ fromJson "B" "next.id" }}'
body = '{"name": "{{ fromJson "A" "auth.name" }}"}'
"#;

fn runner(sequence: RequestSequence, metrics: Arc<MetricsRegistry>) -> (Runner, StatusAggregator) {
    let status = StatusAggregator::new();
    let runner = Runner::new(
        0,
        sequence,
        RequestExecutor::new(Client::new(), metrics.clone()),
        status.clone(),
        metrics,
    );
    (runner, status)
}

/// A 的响应驱动 B 的 URL 和 Header，B 的响应驱动 C 的 URL
#[tokio::test]
async fn test_chained_requests_in_one_pass() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "auth": {"path": "p", "name": "n", "token": "t"}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/p"))
        .and(header("Authorization", "Bearer t"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "next": {"id": 42}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/items/42"))
        .and(body_json(serde_json::json!({"name": "n"})))
        .respond_with(ResponseTemplate::new(201).set_body_string("created"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let targets = temp_dir.path().join("targets.toml");
    fs::write(&targets, TARGETS.replace("MOCK", &mock_server.uri())).unwrap();

    let metrics = Arc::new(MetricsRegistry::new());
    let sequence = RequestSequence::load_or_empty(&targets, metrics.as_ref());
    assert_eq!(sequence.len(), 3);

    let (mut runner, status) = runner(sequence, metrics.clone());
    let results = runner.run_pass().await;

    let visited: Vec<_> = results.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(visited, vec!["A", "B", "C"]);
    assert!(results.iter().all(|r| r.bucket == StatusBucket::Success));
    assert_eq!(results[2].status_code, 201);

    assert_eq!(runner.history().get("C"), Some("created"));
    assert_eq!(metrics.counter_total(names::ERRORS_TOTAL), 0.0);
    assert_eq!(
        metrics.counter(
            names::EXPECTED_RESPONSE_TOTAL,
            &[("name", "A"), ("part", "body")]
        ),
        1.0
    );

    status.flush().await;
    let snapshot = status.snapshot().await;
    assert_eq!(snapshot.slowest_for("C")[0].response, serde_json::json!("created"));
    assert_eq!(snapshot.slowest_for("B")[0].response["next"]["id"], 42);
}

/// 传输失败的请求不写入历史，后续引用按缺失处理
#[tokio::test]
async fn test_transport_failure_skips_history() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/b/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("fine"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let sequence = RequestSequence::new(vec![
        chainprobe::config::RequestSpec::new("A", "GET", "http://127.0.0.1:1/login"),
        chainprobe::config::RequestSpec::new(
            "B",
            "GET",
            format!(r#"{}/b/{{{{ fromJson "A" "auth.path" }}}}"#, mock_server.uri()),
        ),
    ]);

    let metrics = Arc::new(MetricsRegistry::new());
    let (mut runner, status) = runner(sequence, metrics.clone());
    let results = runner.run_pass().await;

    assert_eq!(results[0].bucket, StatusBucket::Error);
    assert_eq!(results[1].bucket, StatusBucket::Success);
    assert_eq!(runner.history().get("A"), None);
    assert_eq!(runner.history().get("B"), Some("fine"));
    assert_eq!(
        metrics.counter(names::ERRORS_TOTAL, &[("error", "template_missing_entry")]),
        1.0
    );

    status.flush().await;
    let snapshot = status.snapshot().await;
    assert_eq!(snapshot.errors_for("A").len(), 1);
    assert!(snapshot.slowest_for("A").is_empty());
    assert_eq!(snapshot.errors_for("A")[0].status, 0);
}

/// 只应答一次的服务端，应答后关闭监听端口，之后的连接都会被拒绝
async fn serve_once(body: &'static str) -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }

        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();
    });

    (format!("http://{}", addr), handle)
}

/// 上一轮的响应不会泄漏到下一轮：第二轮 A 传输失败后，B 按缺失处理
#[tokio::test]
async fn test_failed_request_does_not_reuse_previous_pass() {
    let (flaky_uri, served) = serve_once(r#"{"auth":{"path":"stale"}}"#).await;
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/b/stale"))
        .respond_with(ResponseTemplate::new(200).set_body_string("first"))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/b/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("second"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let sequence = RequestSequence::new(vec![
        chainprobe::config::RequestSpec::new("A", "GET", format!("{}/login", flaky_uri)),
        chainprobe::config::RequestSpec::new(
            "B",
            "GET",
            format!(r#"{}/b/{{{{ fromJson "A" "auth.path" }}}}"#, mock_server.uri()),
        ),
    ]);

    let metrics = Arc::new(MetricsRegistry::new());
    let (mut runner, _status) = runner(sequence, metrics.clone());

    let first = runner.run_pass().await;
    assert_eq!(first[0].bucket, StatusBucket::Success);
    assert_eq!(runner.history().get("B"), Some("first"));
    served.await.unwrap();

    let second = runner.run_pass().await;
    assert_eq!(second[0].bucket, StatusBucket::Error);
    assert_eq!(second[1].bucket, StatusBucket::Success);
    assert_eq!(runner.history().get("A"), None);
    assert_eq!(runner.history().get("B"), Some("second"));
    assert_eq!(
        metrics.counter(names::ERRORS_TOTAL, &[("error", "template_missing_entry")]),
        1.0
    );
}

/// 4xx/5xx 仍然写入历史
#[tokio::test]
async fn test_error_status_still_recorded() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(503).set_body_json(serde_json::json!({
            "retry": "later"
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/later"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let sequence = RequestSequence::new(vec![
        chainprobe::config::RequestSpec::new("A", "GET", format!("{}/broken", mock_server.uri())),
        chainprobe::config::RequestSpec::new(
            "B",
            "GET",
            format!(r#"{}/{{{{ fromJson "A" "retry" }}}}"#, mock_server.uri()),
        ),
    ]);

    let metrics = Arc::new(MetricsRegistry::new());
    let (mut runner, _status) = runner(sequence, metrics.clone());
    let results = runner.run_pass().await;

    assert_eq!(results[0].bucket, StatusBucket::ServerError);
    assert_eq!(results[1].bucket, StatusBucket::ClientError);
    assert_eq!(runner.history().get("A"), Some(r#"{"retry":"later"}"#));
    assert_eq!(
        metrics.counter(
            names::REQUEST_STATUS_TOTAL,
            &[("name", "A"), ("status", "5xx")]
        ),
        1.0
    );
}
