// ==========================================
// 订单行缺货处理 - 通知分发器
// ==========================================
// 职责: 把构建好的通知负载发送到外部通知服务 (单一地址, HTTP POST)
// 红线: 分发失败永不回滚状态转换
// 策略: 软成功状态码集合视为成功; 其他失败记录日志并上报失败通道
// ==========================================

use crate::domain::notification::NotificationPayload;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::events::{DispatchFailureEvent, OptionalFailureSink};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info, warn};

/// 默认软成功状态码 (对界面无意义的瞬时/无关错误)
pub const DEFAULT_SOFT_SUCCESS_STATUSES: [u16; 7] = [404, 408, 409, 429, 502, 503, 504];

// ==========================================
// NotificationDispatcher Trait
// ==========================================

/// 通知分发器
///
/// 执行器只依赖此 trait; 更严格的策略 (排队重试等) 通过替换实现获得,
/// 不需要改动执行器
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// 发送通知
    ///
    /// # 返回
    /// - `true`: 已送达,或失败被吸收
    /// - `false`: 严格策略下的送达失败 (调用方仍不回滚)
    async fn send(&self, payload: &NotificationPayload) -> bool;
}

// ==========================================
// 送达策略
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryPolicy {
    /// 失败一律返回 true
    #[default]
    FireAndForget,
    /// 非软成功的失败返回 false
    Strict,
}

/// HTTP 分发配置
#[derive(Debug, Clone)]
pub struct HttpDispatchConfig {
    pub endpoint: String,
    pub timeout: Option<Duration>,
    pub soft_success_statuses: Vec<u16>,
    pub policy: DeliveryPolicy,
}

impl HttpDispatchConfig {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            timeout: None,
            soft_success_statuses: DEFAULT_SOFT_SUCCESS_STATUSES.to_vec(),
            policy: DeliveryPolicy::FireAndForget,
        }
    }
}

// ==========================================
// HttpNotificationDispatcher - reqwest 实现
// ==========================================
pub struct HttpNotificationDispatcher {
    http: reqwest::Client,
    config: HttpDispatchConfig,
    failure_sink: OptionalFailureSink,
}

impl HttpNotificationDispatcher {
    /// 创建 HTTP 分发器
    ///
    /// # 错误
    /// - HTTP 客户端构建失败 (TLS 初始化等)
    pub fn new(config: HttpDispatchConfig, failure_sink: OptionalFailureSink) -> EngineResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| EngineError::Other(anyhow::Error::new(e)))?;

        info!(
            "通知分发器已创建: endpoint={}, timeout={:?}, policy={:?}",
            config.endpoint, config.timeout, config.policy
        );

        Ok(Self {
            http,
            config,
            failure_sink,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    fn is_soft_success(&self, status: u16) -> bool {
        self.config.soft_success_statuses.contains(&status)
    }

    fn absorb_failure(&self, payload: &NotificationPayload, status: Option<u16>, error: String) -> bool {
        warn!(
            "通知分发失败 (已吸收): entity_id={}, tag={}, status={:?}, error={}",
            payload.entity_id, payload.tag, status, error
        );

        self.failure_sink.report(DispatchFailureEvent {
            entity_id: payload.entity_id.clone(),
            context_id: payload.context_id.clone(),
            tag: payload.tag.as_str().to_string(),
            endpoint: self.config.endpoint.clone(),
            status,
            error,
            occurred_at: Utc::now(),
        });

        match self.config.policy {
            DeliveryPolicy::FireAndForget => true,
            DeliveryPolicy::Strict => false,
        }
    }
}

#[async_trait]
impl NotificationDispatcher for HttpNotificationDispatcher {
    async fn send(&self, payload: &NotificationPayload) -> bool {
        let response = self
            .http
            .post(&self.config.endpoint)
            .json(payload)
            .send()
            .await;

        match response {
            Ok(resp) => {
                let status = resp.status();
                if status.is_success() {
                    debug!(
                        "通知已送达: entity_id={}, tag={}, status={}",
                        payload.entity_id, payload.tag, status
                    );
                    true
                } else if self.is_soft_success(status.as_u16()) {
                    debug!(
                        "通知返回软成功状态码,视为成功: entity_id={}, tag={}, status={}",
                        payload.entity_id, payload.tag, status
                    );
                    true
                } else {
                    self.absorb_failure(payload, Some(status.as_u16()), status.to_string())
                }
            }
            Err(e) => {
                let status = e.status().map(|s| s.as_u16());
                self.absorb_failure(payload, status, e.to_string())
            }
        }
    }
}

// ==========================================
// NoOpDispatcher - 未配置通知地址
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct NoOpDispatcher;

#[async_trait]
impl NotificationDispatcher for NoOpDispatcher {
    async fn send(&self, payload: &NotificationPayload) -> bool {
        debug!(
            "NoOpDispatcher: 通知未启用,跳过 - entity_id={}, tag={}",
            payload.entity_id, payload.tag
        );
        true
    }
}

// ==========================================
// RecordingDispatcher - 内存记录 (测试/试运行)
// ==========================================
#[derive(Debug)]
pub struct RecordingDispatcher {
    sent: Mutex<Vec<NotificationPayload>>,
    reply: bool,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::replying(true)
    }

    /// 指定固定返回值
    pub fn replying(reply: bool) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            reply,
        }
    }

    /// 已发送的通知副本
    pub fn sent(&self) -> Vec<NotificationPayload> {
        match self.sent.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn count(&self) -> usize {
        self.sent().len()
    }
}

impl Default for RecordingDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn send(&self, payload: &NotificationPayload) -> bool {
        match self.sent.lock() {
            Ok(mut guard) => guard.push(payload.clone()),
            Err(poisoned) => poisoned.into_inner().push(payload.clone()),
        }
        self.reply
    }
}
