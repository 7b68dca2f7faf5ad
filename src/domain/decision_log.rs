// ==========================================
// 订单行缺货处理 - 决策日志领域模型
// ==========================================
// 红线: 只追加,不修改,不删除
// 用途: 审计追踪; 并发覆盖时可据此发现被覆盖的决策
// 对齐: decision_log 表
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

// ==========================================
// DecisionLogEntry - 决策日志条目
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionLogEntry {
    // ===== 主键 =====
    pub log_id: String,     // 日志ID (UUID)
    pub context_id: String, // 订单/上下文
    pub line_id: String,    // 订单行ID (规范化后)

    // ===== 动作 =====
    pub rule_id: String,
    pub actor_role: String,         // 发起角色
    pub actor: Option<String>,      // 操作人
    pub status_before: String,
    pub status_after: String,
    pub logged_at: NaiveDateTime,

    // ===== 负载 =====
    pub params_json: Option<JsonValue>, // 动作参数 (JSON)
    pub notification_tag: String,
    pub notification_delivered: bool, // 通知是否成功送达 (软失败视为送达)
    pub note: Option<String>,         // 持久化备注
}

impl DecisionLogEntry {
    /// 创建新的决策日志条目
    ///
    /// # 参数
    /// - `context_id`: 订单/上下文ID
    /// - `line_id`: 订单行ID
    /// - `rule_id`: 执行的规则ID
    /// - `actor_role`: 发起角色
    pub fn new(context_id: &str, line_id: &str, rule_id: &str, actor_role: &str) -> Self {
        Self {
            log_id: uuid::Uuid::new_v4().to_string(),
            context_id: context_id.to_string(),
            line_id: line_id.to_string(),
            rule_id: rule_id.to_string(),
            actor_role: actor_role.to_string(),
            actor: None,
            status_before: String::new(),
            status_after: String::new(),
            logged_at: chrono::Utc::now().naive_utc(),
            params_json: None,
            notification_tag: String::new(),
            notification_delivered: false,
            note: None,
        }
    }

    /// 设置状态变化
    pub fn with_status_change(mut self, before: &str, after: &str) -> Self {
        self.status_before = before.to_string();
        self.status_after = after.to_string();
        self
    }

    /// 设置操作人
    pub fn with_actor(mut self, actor: Option<String>) -> Self {
        self.actor = actor;
        self
    }

    /// 设置动作参数
    pub fn with_params(mut self, params: JsonValue) -> Self {
        self.params_json = Some(params);
        self
    }

    /// 设置通知结果
    pub fn with_notification(mut self, tag: &str, delivered: bool) -> Self {
        self.notification_tag = tag.to_string();
        self.notification_delivered = delivered;
        self
    }

    /// 设置备注
    pub fn with_note(mut self, note: Option<String>) -> Self {
        self.note = note;
        self
    }
}
