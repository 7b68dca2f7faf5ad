// ==========================================
// HTTP 通知分发器集成测试 (wiremock 桩服务)
// ==========================================
// 覆盖: 成功送达 / 软成功状态码 / 硬失败吸收并上报 /
//       严格策略 / 网络错误 / 执行器不因分发失败回滚
// ==========================================


use serde_json::json;
use shortage_workflow::domain::{LineStatus, NotificationPayload, RuleGroup};
use shortage_workflow::engine::{
    build_for_tag, BuildContext, ChannelFailureSink, DeliveryPolicy, HttpDispatchConfig,
    HttpNotificationDispatcher, NotificationDispatcher, OptionalFailureSink, RuleCatalog,
    TransitionExecutor, TransitionParams,
};
use shortage_workflow::NotificationTag;
use std::sync::Arc;
use std::time::Duration;
use test_helpers::*;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sample_payload() -> NotificationPayload {
    let ctx = BuildContext::new("SO-1", RuleGroup::Phase1, fixed_now());
    build_for_tag(NotificationTag::DemandToSupply, &shortage_line("L-1"), &ctx)
}

fn dispatcher_for(
    server: &MockServer,
    policy: DeliveryPolicy,
) -> (
    HttpNotificationDispatcher,
    tokio::sync::mpsc::UnboundedReceiver<shortage_workflow::engine::DispatchFailureEvent>,
) {
    let mut config = HttpDispatchConfig::new(&format!("{}/notify", server.uri()));
    config.timeout = Some(Duration::from_secs(5));
    config.policy = policy;

    let (sink, rx) = ChannelFailureSink::new();
    let dispatcher =
        HttpNotificationDispatcher::new(config, OptionalFailureSink::with_sink(Arc::new(sink)))
            .expect("HTTP 客户端应可构建");
    (dispatcher, rx)
}

async fn mount_status(server: &MockServer, status: u16) {
    Mock::given(method("POST"))
        .and(path("/notify"))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_successful_delivery_posts_json_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/notify"))
        .and(header("content-type", "application/json"))
        .and(body_partial_json(json!({
            "tag": "DEMAND_TO_SUPPLY",
            "entityId": "L-1",
            "contextId": "SO-1",
            "details": {"kind": "SUPPLY_REQUEST"}
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let (dispatcher, mut rx) = dispatcher_for(&server, DeliveryPolicy::FireAndForget);
    assert!(dispatcher.send(&sample_payload()).await);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_soft_success_status_is_treated_as_delivered() {
    let server = MockServer::start().await;
    mount_status(&server, 503).await;

    let (dispatcher, mut rx) = dispatcher_for(&server, DeliveryPolicy::Strict);
    assert!(dispatcher.send(&sample_payload()).await);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_hard_failure_is_absorbed_and_reported() {
    let server = MockServer::start().await;
    mount_status(&server, 500).await;

    let (dispatcher, mut rx) = dispatcher_for(&server, DeliveryPolicy::FireAndForget);
    assert!(dispatcher.send(&sample_payload()).await);

    let event = rx.try_recv().expect("硬失败应上报");
    assert_eq!(event.status, Some(500));
    assert_eq!(event.entity_id, "L-1");
    assert_eq!(event.context_id, "SO-1");
    assert_eq!(event.tag, "DEMAND_TO_SUPPLY");
    assert!(event.endpoint.ends_with("/notify"));
}

#[tokio::test]
async fn test_strict_policy_reports_hard_failure_as_undelivered() {
    let server = MockServer::start().await;
    mount_status(&server, 500).await;

    let (dispatcher, mut rx) = dispatcher_for(&server, DeliveryPolicy::Strict);
    assert!(!dispatcher.send(&sample_payload()).await);
    assert!(rx.try_recv().is_ok());
}

#[tokio::test]
async fn test_custom_soft_success_set() {
    let server = MockServer::start().await;
    mount_status(&server, 503).await;

    let mut config = HttpDispatchConfig::new(&format!("{}/notify", server.uri()));
    config.soft_success_statuses = vec![404];
    config.policy = DeliveryPolicy::Strict;
    let dispatcher = HttpNotificationDispatcher::new(config, OptionalFailureSink::none()).unwrap();

    assert!(!dispatcher.send(&sample_payload()).await);
}

#[tokio::test]
async fn test_network_error_is_absorbed() {
    // 取一个已释放的本地端口,连接会被拒绝
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let mut config = HttpDispatchConfig::new(&format!("http://127.0.0.1:{}/notify", port));
    config.timeout = Some(Duration::from_secs(2));
    let (sink, mut rx) = ChannelFailureSink::new();
    let dispatcher =
        HttpNotificationDispatcher::new(config, OptionalFailureSink::with_sink(Arc::new(sink)))
            .unwrap();

    assert!(dispatcher.send(&sample_payload()).await);
    let event = rx.try_recv().expect("网络错误应上报");
    assert_eq!(event.status, None);
}

#[tokio::test]
async fn test_executor_keeps_transition_when_endpoint_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/notify"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let (dispatcher, mut rx) = dispatcher_for(&server, DeliveryPolicy::FireAndForget);
    let executor = TransitionExecutor::new(Arc::new(RuleCatalog::builtin()), Arc::new(dispatcher));

    let outcome = executor
        .execute_at("P1-WAIT", &shortage_line("L-1"), "SO-1", &TransitionParams::default(), fixed_now())
        .await
        .unwrap();

    assert!(outcome.delivered);
    assert_eq!(outcome.status(), LineStatus::ShortagePendingSupplyOwner);
    assert!(rx.try_recv().is_ok());
}
