// ==========================================
// 订单行缺货处理 - API层错误类型
// ==========================================
// 职责: 把引擎/仓储错误转换为用户可读的错误消息
// 说明: 只有配置错误 (规则缺失) 与业务校验失败会中止用户动作;
//       通知分发失败不会出现在这里
// ==========================================

use crate::engine::error::EngineError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 配置错误
    // ==========================================
    #[error("规则未找到: {0}")]
    RuleNotFound(String),

    #[error("规则目录格式错误: {0}")]
    CatalogFormat(String),

    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("无效的状态转换: from={from} to={to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    // ==========================================
    // 外部数据源错误
    // ==========================================
    #[error("订单行数据源错误: {0}")]
    SourceError(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// 从 EngineError 转换
// ==========================================
impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::RuleNotFound { rule_id } => ApiError::RuleNotFound(rule_id),
            EngineError::CatalogFormat(msg) => ApiError::CatalogFormat(msg),
            EngineError::RulePhaseMismatch {
                rule_id,
                group,
                phase,
            } => ApiError::BusinessRuleViolation(format!(
                "规则{}属于{},不适用于第{}次交付",
                rule_id, group, phase
            )),
            EngineError::InvalidExpediteTransition { from, to } => {
                ApiError::InvalidStateTransition {
                    from: from.to_string(),
                    to: to.to_string(),
                }
            }
            EngineError::ExpediteNotEligible { line_id } => ApiError::BusinessRuleViolation(
                format!("订单行{}不满足加急条件 (需未来交付且理论库存充足)", line_id),
            ),
            EngineError::Other(e) => ApiError::Other(e),
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::SerializationError(msg) => {
                ApiError::InternalError(format!("历史数据序列化失败: {}", msg))
            }
            RepositoryError::Other(e) => ApiError::Other(e),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::ExpediteStatus;

    #[test]
    fn test_rule_not_found_conversion() {
        let api_err: ApiError = EngineError::RuleNotFound {
            rule_id: "ZZZ".to_string(),
        }
        .into();
        assert!(matches!(api_err, ApiError::RuleNotFound(ref id) if id == "ZZZ"));
    }

    #[test]
    fn test_expedite_transition_conversion() {
        let api_err: ApiError = EngineError::InvalidExpediteTransition {
            from: ExpediteStatus::Accepted,
            to: ExpediteStatus::Pending,
        }
        .into();
        assert!(matches!(api_err, ApiError::InvalidStateTransition { .. }));
    }

    #[test]
    fn test_phase_mismatch_is_business_violation() {
        let api_err: ApiError = EngineError::RulePhaseMismatch {
            rule_id: "P1-SHIP".to_string(),
            group: crate::domain::types::RuleGroup::Phase1,
            phase: 3,
        }
        .into();
        match api_err {
            ApiError::BusinessRuleViolation(msg) => {
                assert!(msg.contains("P1-SHIP"));
                assert!(msg.contains("第3次交付"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_lock_error_conversion() {
        let api_err: ApiError = RepositoryError::LockError("poisoned".to_string()).into();
        match api_err {
            ApiError::DatabaseConnectionError(msg) => assert!(msg.contains("poisoned")),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
