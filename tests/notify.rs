// tests/notify.rs

mod common;

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use jobnotify::config::RemotePushParams;
use jobnotify::errors::JobNotifyError;
use jobnotify::notify::{
    Channel, DeliveryOutcome, RemotePushChannel, build_channel_with_env, deliver_with_fallback,
};
use jobnotify::notify::push::{PUSH_KEY_ENV, check_business_code};
use jobnotify_test_utils::{FakeChannel, fake_env, init_tracing, with_timeout};

use common::captured_local_print;

const KEY: &str = "test-key";

async fn push_server(response: ResponseTemplate) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/xxtui/{KEY}")))
        .respond_with(response)
        .mount(&server)
        .await;
    server
}

fn channel_for(server: &MockServer, timeout: Duration) -> RemotePushChannel {
    RemotePushChannel::new(KEY, &format!("{}/xxtui", server.uri()), timeout).unwrap()
}

#[tokio::test]
async fn push_posts_markdown_payload() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/xxtui/{KEY}")))
        .and(body_json(json!({ "content": "## Job finished", "type": "markdown" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "code": 0, "msg": "ok" })))
        .expect(1)
        .mount(&server)
        .await;

    let channel = channel_for(&server, Duration::from_secs(5));
    with_timeout(channel.deliver("## Job finished")).await.unwrap();
}

#[tokio::test]
async fn server_error_is_a_delivery_error() {
    init_tracing();
    let server = push_server(ResponseTemplate::new(500).set_body_string("boom")).await;
    let channel = channel_for(&server, Duration::from_secs(5));

    match with_timeout(channel.deliver("report")).await {
        Err(JobNotifyError::DeliveryError(msg)) => assert!(msg.contains("500")),
        other => panic!("expected DeliveryError, got {other:?}"),
    }
}

#[tokio::test]
async fn business_error_code_is_a_delivery_error() {
    init_tracing();
    let server = push_server(
        ResponseTemplate::new(200).set_body_json(json!({ "code": 40001, "msg": "invalid key" })),
    )
    .await;
    let channel = channel_for(&server, Duration::from_secs(5));

    match with_timeout(channel.deliver("report")).await {
        Err(JobNotifyError::DeliveryError(msg)) => assert!(msg.contains("invalid key")),
        other => panic!("expected DeliveryError, got {other:?}"),
    }
}

#[tokio::test]
async fn slow_service_times_out() {
    init_tracing();
    let server = push_server(ResponseTemplate::new(200).set_delay(Duration::from_secs(3))).await;
    let channel = channel_for(&server, Duration::from_millis(300));

    let result = with_timeout(channel.deliver("report")).await;
    assert!(matches!(result, Err(JobNotifyError::DeliveryError(_))));
}

#[tokio::test]
async fn unreachable_service_does_not_leak_the_key() {
    init_tracing();
    // Nothing listens on port 9 (discard) in the test environment.
    let channel = RemotePushChannel::new(KEY, "http://127.0.0.1:9/xxtui", Duration::from_secs(2))
        .unwrap();

    match with_timeout(channel.deliver("report")).await {
        Err(err) => assert!(!err.to_string().contains(KEY)),
        Ok(()) => panic!("delivery to a closed port should fail"),
    }
    assert!(!format!("{channel:?}").contains(KEY));
}

#[test]
fn business_code_parsing() {
    assert!(check_business_code(r#"{"code":0}"#).is_ok());
    assert!(check_business_code("OK").is_ok());
    assert!(check_business_code("").is_ok());
    assert!(check_business_code(r#"{"msg":"no code"}"#).is_ok());
    assert!(check_business_code(r#"{"code":1,"msg":"quota"}"#).is_err());
}

#[test]
fn factory_rejects_unknown_names() {
    let result = build_channel_with_env("sms", &RemotePushParams::default(), &fake_env(&[]));
    assert!(matches!(result, Err(JobNotifyError::UnsupportedChannel(_))));
}

#[test]
fn factory_needs_a_push_credential() {
    let params = RemotePushParams::default();

    let missing = build_channel_with_env("remote-push", &params, &fake_env(&[]));
    assert!(matches!(missing, Err(JobNotifyError::ConfigError(_))));

    let channel =
        build_channel_with_env("xxtui", &params, &fake_env(&[(PUSH_KEY_ENV, "k")])).unwrap();
    assert_eq!(channel.name(), "remote-push");

    let local = build_channel_with_env("Local-Print", &params, &fake_env(&[])).unwrap();
    assert_eq!(local.name(), "local-print");
}

#[test]
fn explicit_key_wins_over_environment() {
    let params = RemotePushParams {
        api_key: Some("from-config".to_string()),
        ..RemotePushParams::default()
    };
    let key = jobnotify::notify::push::resolve_api_key(&params, &fake_env(&[(PUSH_KEY_ENV, "from-env")]))
        .unwrap();
    assert_eq!(key, "from-config");
}

#[test]
fn zero_timeout_is_a_config_error() {
    assert!(matches!(
        RemotePushChannel::new(KEY, "http://localhost", Duration::ZERO),
        Err(JobNotifyError::ConfigError(_))
    ));
}

#[tokio::test]
async fn local_print_frames_the_report() {
    let (channel, buffer) = captured_local_print();
    channel.deliver("## Job finished\n- return_code: 0\n").await.unwrap();

    let out = buffer.contents();
    let rule = "=".repeat(60);
    assert!(out.contains(&format!("{rule}\nJob report\n{rule}\n## Job finished\n- return_code: 0\n{rule}\n")));
}

#[tokio::test]
async fn failed_primary_falls_back_exactly_once() {
    init_tracing();
    let primary = FakeChannel::failing("service down");
    let (fallback, buffer) = captured_local_print();

    let outcome = deliver_with_fallback(&primary, &fallback, "## Job finished").await;

    assert!(matches!(outcome, DeliveryOutcome::FellBack { ref reason } if reason.contains("service down")));
    assert!(outcome.reached_someone());
    assert_eq!(primary.attempts(), 1);
    assert_eq!(buffer.contents().matches("## Job finished").count(), 1);
}

#[tokio::test]
async fn successful_primary_leaves_fallback_alone() {
    let primary = FakeChannel::new();
    let fallback = FakeChannel::new();

    let outcome = deliver_with_fallback(&primary, &fallback, "report").await;

    assert_eq!(outcome, DeliveryOutcome::Delivered);
    assert_eq!(primary.deliveries(), vec!["report".to_string()]);
    assert_eq!(fallback.attempts(), 0);
}

#[tokio::test]
async fn both_channels_failing_is_lost_not_an_error() {
    init_tracing();
    let primary = FakeChannel::failing("down");
    let fallback = FakeChannel::failing("stdout closed");

    let outcome = deliver_with_fallback(&primary, &fallback, "report").await;

    assert!(matches!(outcome, DeliveryOutcome::Lost { .. }));
    assert!(!outcome.reached_someone());
}

#[tokio::test]
async fn push_failure_falls_back_to_local_print() {
    init_tracing();
    let server = push_server(ResponseTemplate::new(503)).await;
    let primary = channel_for(&server, Duration::from_secs(5));
    let (fallback, buffer) = captured_local_print();

    let outcome = with_timeout(deliver_with_fallback(&primary, &fallback, "## Job failed")).await;

    assert!(matches!(outcome, DeliveryOutcome::FellBack { .. }));
    assert!(buffer.contents().contains("## Job failed"));
}

#[test]
fn delivery_failures_are_classified() {
    assert!(JobNotifyError::DeliveryError("x".into()).is_delivery_failure());
    assert!(JobNotifyError::ConfigError("x".into()).is_delivery_failure());
    assert!(!JobNotifyError::UnsupportedChannel("x".into()).is_delivery_failure());
}
