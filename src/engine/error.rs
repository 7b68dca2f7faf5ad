// ==========================================
// 订单行缺货处理 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 红线: 规则缺失必须快速失败,禁止静默回退
// 说明: 通知分发失败不属于引擎错误 (见 dispatcher)
// ==========================================

use crate::domain::types::{ExpediteStatus, RuleGroup};
use thiserror::Error;

/// 引擎层错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    // ===== 配置错误 =====
    #[error("规则未找到: rule_id={rule_id}")]
    RuleNotFound { rule_id: String },

    #[error("规则目录格式错误: {0}")]
    CatalogFormat(String),

    #[error("规则不适用于该交付阶段: rule_id={rule_id}, group={group}, phase={phase}")]
    RulePhaseMismatch {
        rule_id: String,
        group: RuleGroup,
        phase: u32,
    },

    // ===== 加急状态机 =====
    #[error("无效的加急状态转换: from={from} to={to}")]
    InvalidExpediteTransition {
        from: ExpediteStatus,
        to: ExpediteStatus,
    },

    #[error("订单行不满足加急条件 (需未来交付且理论库存充足): line_id={line_id}")]
    ExpediteNotEligible { line_id: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::CatalogFormat(err.to_string())
    }
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;
