// ==========================================
// 订单行缺货处理 - 状态转换执行器
// ==========================================
// 主流程: 查规则 → 写决策槽位 → 构建并分发通知 → 落定生命周期状态
// 红线: 规则缺失立即失败,订单行不变,不发送任何通知
// 红线: 规则组必须与订单行交付阶段一致 (例外组除外),否则同样不发通知
// 红线: 分发失败不回滚状态转换
// 红线: 输入订单行不修改,结果以新值返回
// ==========================================

use crate::domain::notification::NotificationPayload;
use crate::domain::order_line::OrderLine;
use crate::domain::types::LineStatus;
use crate::engine::dispatcher::NotificationDispatcher;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::notification_builder::{build_for_tag, BuildContext};
use crate::engine::rule_catalog::RuleCatalog;
use crate::engine::transition::{apply_action, TransitionParams};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{error, info, instrument};

// ==========================================
// TransitionOutcome - 执行结果
// ==========================================
#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    pub rule_id: String,
    pub previous_status: LineStatus,
    /// 转换后的订单行 (新值)
    pub line: OrderLine,
    /// 已分发的通知负载
    pub notification: NotificationPayload,
    /// 分发器返回值 (FireAndForget 策略下恒为 true)
    pub delivered: bool,
}

impl TransitionOutcome {
    pub fn status(&self) -> LineStatus {
        self.line.status
    }

    pub fn status_changed(&self) -> bool {
        self.previous_status != self.line.status
    }
}

// ==========================================
// TransitionExecutor
// ==========================================
pub struct TransitionExecutor {
    catalog: Arc<RuleCatalog>,
    dispatcher: Arc<dyn NotificationDispatcher>,
}

impl TransitionExecutor {
    /// 创建执行器
    ///
    /// # 参数
    /// - catalog: 规则目录
    /// - dispatcher: 通知分发器
    pub fn new(catalog: Arc<RuleCatalog>, dispatcher: Arc<dyn NotificationDispatcher>) -> Self {
        Self {
            catalog,
            dispatcher,
        }
    }

    pub fn catalog(&self) -> &RuleCatalog {
        &self.catalog
    }

    /// 执行规则 (时间取当前时刻)
    pub async fn execute(
        &self,
        rule_id: &str,
        line: &OrderLine,
        context_id: &str,
        params: &TransitionParams,
    ) -> EngineResult<TransitionOutcome> {
        self.execute_at(rule_id, line, context_id, params, Utc::now())
            .await
    }

    /// 执行规则 (指定时刻)
    ///
    /// # 错误
    /// - `RuleNotFound`: 规则ID不在目录中
    /// - `RulePhaseMismatch`: 规则组与订单行交付阶段不符
    /// - 加急相关错误: 见 `transition::apply_action`
    #[instrument(skip_all, fields(rule_id = %rule_id, line_id = %line.id, context_id = %context_id))]
    pub async fn execute_at(
        &self,
        rule_id: &str,
        line: &OrderLine,
        context_id: &str,
        params: &TransitionParams,
        now: DateTime<Utc>,
    ) -> EngineResult<TransitionOutcome> {
        // 1. 查规则
        let rule = match self.catalog.require(rule_id) {
            Ok(rule) => rule,
            Err(e) => {
                error!("规则未找到,转换中止: rule_id={}, line_id={}", rule_id, line.id);
                return Err(e);
            }
        };

        let phase = line.phase();
        if !rule.applies_to_phase(phase) {
            error!(
                "规则与交付阶段不符,转换中止: rule_id={}, group={}, line_id={}, phase={}",
                rule.id, rule.group, line.id, phase
            );
            return Err(EngineError::RulePhaseMismatch {
                rule_id: rule.id.clone(),
                group: rule.group,
                phase,
            });
        }

        // 2. 写决策槽位
        let mut next = apply_action(rule, line, params, now)?;

        // 3. 构建并分发通知
        let ctx = BuildContext::new(context_id, rule.group, now);
        let notification = build_for_tag(rule.notification, &next, &ctx);
        let delivered = self.dispatcher.send(&notification).await;

        // 4. 落定生命周期状态 (不受分发结果影响)
        next.status = rule.next_status.resolve(line.status);

        info!(
            "状态转换完成: rule_id={}, line_id={}, {} -> {}, tag={}, delivered={}",
            rule.id, line.id, line.status, next.status, notification.tag, delivered
        );

        Ok(TransitionOutcome {
            rule_id: rule.id.clone(),
            previous_status: line.status,
            line: next,
            notification,
            delivered,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::NotificationTag;
    use crate::engine::dispatcher::RecordingDispatcher;

    fn executor(dispatcher: Arc<RecordingDispatcher>) -> TransitionExecutor {
        TransitionExecutor::new(Arc::new(RuleCatalog::builtin()), dispatcher)
    }

    #[tokio::test]
    async fn test_wait_moves_to_pending_supply() {
        let dispatcher = Arc::new(RecordingDispatcher::new());
        let exec = executor(dispatcher.clone());
        let line = OrderLine::new("L-1", "矿泉水", "P-001", 10.0, 0.0, 4.0);

        let outcome = exec
            .execute("P1-WAIT", &line, "SO-1", &TransitionParams::default())
            .await
            .unwrap();

        assert_eq!(outcome.status(), LineStatus::ShortagePendingSupplyOwner);
        assert_eq!(outcome.notification.tag, NotificationTag::DemandToSupply);
        assert_eq!(dispatcher.count(), 1);
        assert_eq!(line.status, LineStatus::ShortagePendingDemandOwner);
    }

    #[tokio::test]
    async fn test_unknown_rule_sends_nothing() {
        let dispatcher = Arc::new(RecordingDispatcher::new());
        let exec = executor(dispatcher.clone());
        let line = OrderLine::new("L-1", "矿泉水", "P-001", 10.0, 0.0, 4.0);

        let err = exec
            .execute("NOPE", &line, "SO-1", &TransitionParams::default())
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::RuleNotFound { .. }));
        assert_eq!(dispatcher.count(), 0);
    }

    #[tokio::test]
    async fn test_rule_from_other_phase_sends_nothing() {
        let dispatcher = Arc::new(RecordingDispatcher::new());
        let exec = executor(dispatcher.clone());
        let mut line = OrderLine::new("L-1", "矿泉水", "P-001", 10.0, 0.0, 4.0);
        line.delivery_count = 1;

        let err = exec
            .execute("P1-WAIT", &line, "SO-1", &TransitionParams::default())
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::RulePhaseMismatch { phase: 2, .. }));
        assert_eq!(dispatcher.count(), 0);
    }

    #[tokio::test]
    async fn test_failed_delivery_keeps_transition() {
        let dispatcher = Arc::new(RecordingDispatcher::replying(false));
        let exec = executor(dispatcher.clone());
        let line = OrderLine::new("L-1", "矿泉水", "P-001", 10.0, 0.0, 4.0);

        let outcome = exec
            .execute("P1-CANCEL", &line, "SO-1", &TransitionParams::default())
            .await
            .unwrap();

        assert!(!outcome.delivered);
        assert_eq!(outcome.status(), LineStatus::Resolved);
    }
}
