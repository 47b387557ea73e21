use queue_autoscale_agent::Config;
use queue_autoscale_agent::sender::{ApiResponse, RegistrationParams, ReportParams, ReportingClient};
use serde_json::json;
use std::net::TcpListener;
use std::time::Duration;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_partial_json, body_string, header, method, path, query_param},
};

fn measurements_csv() -> String {
    let now = chrono::Utc::now().timestamp();
    format!("{now},11\n{now},33\n")
}

fn client_for(api_base_url: String) -> ReportingClient {
    let config = Config {
        api_base_url,
        request_timeout_secs: 1,
        ..Config::default()
    };
    ReportingClient::new(&config).unwrap()
}

fn valid_params() -> ReportParams {
    ReportParams::new("web.1", "1232")
}

/// Base URL pointing at a local port nothing is listening on.
fn closed_port_url(scheme: &str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("{scheme}://127.0.0.1:{port}/api/test-app-token")
}

/// Mounts the service behaviour: 200 for identified reports, 400 otherwise.
async fn mount_report_endpoint(server: &MockServer, token: &str) {
    Mock::given(method("POST"))
        .and(path(format!("/api/{token}/reports")))
        .and(query_param("dyno", "web.1"))
        .and(query_param("pid", "1232"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .with_priority(1)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("/api/{token}/reports")))
        .respond_with(ResponseTemplate::new(400))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_report_metrics_returns_success() {
    let server = MockServer::start().await;
    mount_report_endpoint(&server, "test-app-token").await;

    let client = client_for(format!("{}/api/test-app-token", server.uri()));
    let result = client.report_metrics(&valid_params(), measurements_csv()).await;

    assert_eq!(result, ApiResponse::success("OK"));
    assert_eq!(client.connection_stats().successful_requests, 1);
}

#[tokio::test]
async fn test_report_metrics_sends_csv_body() {
    let server = MockServer::start().await;
    let csv = "1700000000,11\n1700000010,33\n";

    Mock::given(method("POST"))
        .and(path("/api/token/reports"))
        .and(header("content-type", "text/csv"))
        .and(body_string(csv))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(format!("{}/api/token", server.uri()));
    let result = client.report_metrics(&valid_params(), csv).await;

    assert!(result.is_success());
    assert_eq!(result.body(), Some(""));
}

#[tokio::test]
async fn test_report_metrics_with_missing_params_returns_bad_request() {
    let server = MockServer::start().await;
    mount_report_endpoint(&server, "bad-app-token").await;

    let client = client_for(format!("{}/api/bad-app-token", server.uri()));
    let result = client
        .report_metrics(&ReportParams::default(), measurements_csv())
        .await;

    assert!(result.is_failure());
    assert_eq!(result.failure_message(), Some("400 - Bad Request"));

    // Nothing was invented locally: the request went out without identity
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url.query(), None);
}

#[tokio::test]
async fn test_report_metrics_to_unreachable_host_returns_service_unavailable() {
    let client = client_for(closed_port_url("http"));
    let result = client.report_metrics(&ReportParams::default(), measurements_csv()).await;

    assert_eq!(result.failure_message(), Some("503 - Service Unavailable"));
    assert_eq!(client.connection_stats().failed_requests, 1);
}

#[tokio::test]
async fn test_https_base_url_uses_the_same_classification() {
    let client = client_for(closed_port_url("https"));
    assert_eq!(
        client.endpoint_url("reports").unwrap().scheme(),
        "https"
    );

    let result = client.report_metrics(&valid_params(), measurements_csv()).await;
    assert_eq!(result.failure_message(), Some("503 - Service Unavailable"));
}

#[tokio::test]
async fn test_timeout_is_classified_as_service_unavailable() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/token/reports"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let client = client_for(format!("{}/api/token", server.uri()));
    let result = client.report_metrics(&valid_params(), measurements_csv()).await;

    assert_eq!(result.failure_message(), Some("503 - Service Unavailable"));
}

#[tokio::test]
async fn test_non_success_status_is_reported_with_reason_phrase() {
    let server = MockServer::start().await;

    for (token, status) in [("unauthorized", 401), ("missing", 404), ("broken", 500)] {
        Mock::given(method("POST"))
            .and(path(format!("/api/{token}/reports")))
            .respond_with(ResponseTemplate::new(status).set_body_string("details"))
            .mount(&server)
            .await;
    }

    let expectations = [
        ("unauthorized", "401 - Unauthorized"),
        ("missing", "404 - Not Found"),
        ("broken", "500 - Internal Server Error"),
    ];

    for (token, expected) in expectations {
        let client = client_for(format!("{}/api/{token}", server.uri()));
        let result = client.report_metrics(&valid_params(), measurements_csv()).await;
        assert_eq!(result.failure_message(), Some(expected));
    }
}

#[tokio::test]
async fn test_repeated_failed_report_gives_same_classification() {
    let server = MockServer::start().await;
    mount_report_endpoint(&server, "bad-app-token").await;

    let client = client_for(format!("{}/api/bad-app-token", server.uri()));
    let csv = measurements_csv();

    let first = client.report_metrics(&ReportParams::default(), csv.clone()).await;
    let second = client.report_metrics(&ReportParams::default(), csv).await;

    assert_eq!(first, second);
    assert_eq!(client.connection_stats().failed_requests, 2);
}

#[tokio::test]
async fn test_requests_carry_report_id_and_user_agent() {
    let server = MockServer::start().await;
    mount_report_endpoint(&server, "token").await;

    let client = client_for(format!("{}/api/token", server.uri()));
    client.report_metrics(&valid_params(), measurements_csv()).await;
    client.report_metrics(&valid_params(), measurements_csv()).await;

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);

    let ids: Vec<String> = requests
        .iter()
        .map(|r| r.headers.get("x-report-id").unwrap().to_str().unwrap().to_string())
        .collect();
    assert_ne!(ids[0], ids[1]);

    let user_agent = requests[0].headers.get("user-agent").unwrap().to_str().unwrap();
    assert!(user_agent.starts_with("queue-autoscale-agent/"));
}

#[tokio::test]
async fn test_register_reporter_returns_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/test-app-token/registrations"))
        .and(query_param("dyno", "web.1"))
        .and(query_param("pid", "1232"))
        .and(body_partial_json(json!({
            "registration": { "agent_version": queue_autoscale_agent::VERSION }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "report_interval": 30 })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(format!("{}/api/test-app-token", server.uri()));
    let params = RegistrationParams::new(valid_params()).with_depth_sources(["default"]);
    let result = client.register_reporter(&params).await;

    assert!(result.is_success());
    assert_eq!(result.data().unwrap()["report_interval"], 30);
}

#[tokio::test]
async fn test_register_reporter_to_unreachable_host_returns_service_unavailable() {
    let client = client_for(closed_port_url("http"));
    let result = client
        .register_reporter(&RegistrationParams::new(valid_params()))
        .await;

    assert_eq!(result.failure_message(), Some("503 - Service Unavailable"));
}
