// ==========================================
// 订单行缺货处理 - 工作流 API
// ==========================================
// 数据流: 外部拉取 → 历史合并 → 角色分桶 → 用户选择动作
//        → 状态转换 (通知分发) → 快照整份覆盖 → 决策日志追加
// 红线: 只有规则缺失/业务校验失败会中止动作; 分发失败对用户不可见
// 红线: 同一订单行同一时刻只允许一个进行中的转换 (后写覆盖先写)
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::api::line_source::OrderLineSource;
use crate::config::config_manager::{ConfigManager, WorkflowConfig};
use crate::domain::decision_log::DecisionLogEntry;
use crate::domain::history::{normalize_line_id, HistoryContext, HistorySnapshot};
use crate::domain::order_line::OrderLine;
use crate::domain::rule::Rule;
use crate::domain::types::Role;
use crate::engine::classifier::{Classification, RoleClassifier};
use crate::engine::dispatcher::{HttpNotificationDispatcher, NoOpDispatcher, NotificationDispatcher};
use crate::engine::events::OptionalFailureSink;
use crate::engine::executor::{TransitionExecutor, TransitionOutcome};
use crate::engine::expedite;
use crate::engine::reconciler::HistoryReconciler;
use crate::engine::rule_catalog::RuleCatalog;
use crate::engine::transition::TransitionParams;
use crate::repository::{DecisionLogRepository, SqliteHistoryRepository};
use chrono::{NaiveDate, Utc};
use rusqlite::Connection;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tracing::{info, instrument, warn};

// ==========================================
// WorkingSet - 某角色视角下的工作集
// ==========================================
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkingSet {
    pub context_id: String,
    pub role: Role,
    pub is_originator: bool,
    pub total: usize,
    pub classification: Classification,
    /// 分桶时暂扣、交由加急子流程处理的订单行 (仅发起方视角)
    pub expedite_candidates: Vec<OrderLine>,
}

// ==========================================
// WorkflowApi
// ==========================================
pub struct WorkflowApi {
    source: Arc<dyn OrderLineSource>,
    history_repo: Arc<SqliteHistoryRepository>,
    decision_log_repo: Arc<DecisionLogRepository>,
    executor: TransitionExecutor,
}

impl WorkflowApi {
    pub fn new(
        source: Arc<dyn OrderLineSource>,
        history_repo: Arc<SqliteHistoryRepository>,
        decision_log_repo: Arc<DecisionLogRepository>,
        executor: TransitionExecutor,
    ) -> Self {
        Self {
            source,
            history_repo,
            decision_log_repo,
            executor,
        }
    }

    /// 按数据库中的配置装配 (内置规则目录)
    ///
    /// # 参数
    /// - conn: 共享数据库连接 (会确保表结构存在)
    /// - source: 订单行数据源
    /// - failure_sink: 分发失败上报通道
    pub fn from_connection(
        conn: Arc<Mutex<Connection>>,
        source: Arc<dyn OrderLineSource>,
        failure_sink: OptionalFailureSink,
    ) -> ApiResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| ApiError::DatabaseConnectionError(format!("锁获取失败: {}", e)))?;
            crate::db::init_schema(&guard).map_err(|e| ApiError::DatabaseError(e.to_string()))?;
        }

        let config = ConfigManager::from_connection(conn.clone())?.get_workflow_config()?;
        let dispatcher = Self::build_dispatcher(&config, failure_sink)?;
        let executor = TransitionExecutor::new(Arc::new(RuleCatalog::builtin()), dispatcher);

        Ok(Self::new(
            source,
            Arc::new(SqliteHistoryRepository::new(conn.clone())),
            Arc::new(DecisionLogRepository::new(conn)),
            executor,
        ))
    }

    /// 按配置选择分发器: 未启用或未配置地址时为 NoOp
    pub fn build_dispatcher(
        config: &WorkflowConfig,
        failure_sink: OptionalFailureSink,
    ) -> ApiResult<Arc<dyn NotificationDispatcher>> {
        match config.http_dispatch_config() {
            Some(http) => Ok(Arc::new(HttpNotificationDispatcher::new(http, failure_sink)?)),
            None => {
                info!("通知地址未配置或已禁用,使用 NoOpDispatcher");
                Ok(Arc::new(NoOpDispatcher))
            }
        }
    }

    pub fn catalog(&self) -> &RuleCatalog {
        self.executor.catalog()
    }

    /// 某角色在该订单行上可用的规则 (按交付阶段 + 例外规则)
    pub fn available_rules(&self, line: &OrderLine, role: Role) -> Vec<&Rule> {
        self.catalog()
            .rules_for_actor(role)
            .into_iter()
            .filter(|rule| rule.applies_to_phase(line.phase()))
            .collect()
    }

    // ==========================================
    // 读取
    // ==========================================

    /// 拉取实时订单行并合并历史
    pub async fn load_lines(&self, context_id: &str) -> ApiResult<Vec<OrderLine>> {
        let fresh = self.source.fetch_lines(context_id).await?;
        let snapshot = self.history_repo.fetch_history(context_id)?;
        Ok(HistoryReconciler::reconcile(fresh, snapshot.as_ref()))
    }

    /// 拉取 → 合并 → 分桶
    #[instrument(skip_all, fields(context_id = %context_id, role = %role, is_originator = %is_originator))]
    pub async fn load_working_set(
        &self,
        context_id: &str,
        role: Role,
        is_originator: bool,
        today: NaiveDate,
    ) -> ApiResult<WorkingSet> {
        let lines = self.load_lines(context_id).await?;
        let classification = RoleClassifier::classify(&lines, role, is_originator, today);
        let expedite_candidates = if is_originator {
            expedite::expedite_candidates(&lines, today)
        } else {
            Vec::new()
        };

        Ok(WorkingSet {
            context_id: context_id.to_string(),
            role,
            is_originator,
            total: lines.len(),
            classification,
            expedite_candidates,
        })
    }

    /// 加急子流程的候选订单行
    pub async fn expedite_candidates(
        &self,
        context_id: &str,
        today: NaiveDate,
    ) -> ApiResult<Vec<OrderLine>> {
        let lines = self.load_lines(context_id).await?;
        Ok(expedite::expedite_candidates(&lines, today))
    }

    pub fn history(&self, context_id: &str) -> ApiResult<Option<HistorySnapshot>> {
        Ok(self.history_repo.fetch_history(context_id)?)
    }

    pub fn decision_log(&self, context_id: &str) -> ApiResult<Vec<DecisionLogEntry>> {
        Ok(self.decision_log_repo.find_by_context(context_id)?)
    }

    // ==========================================
    // 动作
    // ==========================================

    /// 执行用户选择的动作
    ///
    /// 拉取 → 合并 → 执行 → 快照读取-合并-整份覆盖 → 决策日志
    ///
    /// # 错误
    /// - `RuleNotFound`: 规则ID不存在 (未写入任何数据)
    /// - `NotFound`: 上下文中没有该订单行
    /// - 加急校验失败
    #[instrument(skip_all, fields(context_id = %context_id, rule_id = %rule_id, line_id = %line_id))]
    pub async fn apply_action(
        &self,
        context_id: &str,
        rule_id: &str,
        line_id: &str,
        params: TransitionParams,
        note: Option<&str>,
    ) -> ApiResult<TransitionOutcome> {
        let lines = self.load_lines(context_id).await?;
        let wanted = normalize_line_id(line_id);
        let line = lines
            .iter()
            .find(|l| normalize_line_id(&l.id) == wanted)
            .ok_or_else(|| {
                ApiError::NotFound(format!("订单行(id={})不在上下文{}中", line_id, context_id))
            })?;

        let outcome = self
            .executor
            .execute(rule_id, line, context_id, &params)
            .await?;

        // 读取-合并-整份覆盖
        let now = Utc::now();
        let base = self
            .history_repo
            .fetch_history(context_id)?
            .unwrap_or_else(|| HistorySnapshot::empty(HistoryContext::new(context_id), now));
        let snapshot = base.with_line(&outcome.line, now);
        if !self.history_repo.persist_history(context_id, &snapshot, note)? {
            warn!("历史快照未写入: context_id={}", context_id);
        }

        // 决策日志写入失败只告警: 转换与快照已生效
        if let Err(e) = self.append_decision_log(context_id, &wanted, &outcome, &params, note) {
            warn!(
                "决策日志写入失败,转换已生效: context_id={}, line_id={}, rule_id={}, error={}",
                context_id, wanted, outcome.rule_id, e
            );
        }

        Ok(outcome)
    }

    fn append_decision_log(
        &self,
        context_id: &str,
        line_id: &str,
        outcome: &TransitionOutcome,
        params: &TransitionParams,
        note: Option<&str>,
    ) -> ApiResult<()> {
        let actor_role = self
            .catalog()
            .find_rule(&outcome.rule_id)
            .map(|r| r.actor.as_str())
            .unwrap_or("UNKNOWN");
        let params_json = serde_json::to_value(params)
            .map_err(|e| ApiError::InternalError(format!("动作参数序列化失败: {}", e)))?;

        let entry = DecisionLogEntry::new(context_id, line_id, &outcome.rule_id, actor_role)
            .with_status_change(outcome.previous_status.as_str(), outcome.line.status.as_str())
            .with_actor(params.actor.clone())
            .with_params(params_json)
            .with_notification(outcome.notification.tag.as_str(), outcome.delivered)
            .with_note(note.map(|n| n.to_string()));
        self.decision_log_repo.insert(&entry)?;
        Ok(())
    }
}
