// ==========================================
// 订单行缺货处理 - 通知分发失败事件
// ==========================================
// 职责: 定义分发失败事件与上报 trait,供运维观测
// 说明: 分发失败不会回滚状态转换,只在此通道上可见
// 说明: 上报是非阻塞的,不影响调用方
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

// ==========================================
// 分发失败事件
// ==========================================

/// 通知分发失败事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchFailureEvent {
    /// 订单行 ID
    pub entity_id: String,
    /// 订单/上下文 ID
    pub context_id: String,
    /// 通知类型标签
    pub tag: String,
    /// 目标地址
    pub endpoint: String,
    /// HTTP 状态码 (网络错误时为 None)
    pub status: Option<u16>,
    /// 错误描述
    pub error: String,
    pub occurred_at: DateTime<Utc>,
}

// ==========================================
// 失败上报 Trait
// ==========================================

/// 分发失败上报者
///
/// # 实现说明
/// - 实现必须是非阻塞的
/// - 上报本身失败时只记录日志
pub trait DispatchFailureSink: Send + Sync {
    fn report(&self, event: DispatchFailureEvent);
}

/// 空操作上报者
///
/// 用于不需要观测失败的场景（如单元测试）
#[derive(Debug, Clone, Default)]
pub struct NoOpFailureSink;

impl DispatchFailureSink for NoOpFailureSink {
    fn report(&self, event: DispatchFailureEvent) {
        tracing::debug!(
            "NoOpFailureSink: 跳过失败上报 - entity_id={}, tag={}",
            event.entity_id,
            event.tag
        );
    }
}

/// 基于 tokio 无界通道的上报者
#[derive(Debug, Clone)]
pub struct ChannelFailureSink {
    sender: UnboundedSender<DispatchFailureEvent>,
}

impl ChannelFailureSink {
    /// 创建上报者及其接收端
    pub fn new() -> (Self, UnboundedReceiver<DispatchFailureEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl DispatchFailureSink for ChannelFailureSink {
    fn report(&self, event: DispatchFailureEvent) {
        if let Err(e) = self.sender.send(event) {
            tracing::warn!("分发失败事件无人接收,已丢弃: entity_id={}", e.0.entity_id);
        }
    }
}

/// 可选的失败上报者包装
///
/// 简化 Option<Arc<dyn DispatchFailureSink>> 的使用
#[derive(Clone, Default)]
pub struct OptionalFailureSink {
    inner: Option<Arc<dyn DispatchFailureSink>>,
}

impl OptionalFailureSink {
    pub fn with_sink(sink: Arc<dyn DispatchFailureSink>) -> Self {
        Self { inner: Some(sink) }
    }

    pub fn none() -> Self {
        Self { inner: None }
    }

    pub fn report(&self, event: DispatchFailureEvent) {
        match &self.inner {
            Some(sink) => sink.report(event),
            None => {
                tracing::debug!(
                    "OptionalFailureSink: 未配置上报者,跳过 - entity_id={}, tag={}",
                    event.entity_id,
                    event.tag
                );
            }
        }
    }

    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }
}
