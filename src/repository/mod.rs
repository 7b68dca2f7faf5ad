// ==========================================
// 订单行缺货处理 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// 职责: 历史快照存取、决策日志追加,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod decision_log_repo;
pub mod error;
pub mod history_repo;

// 重导出核心仓储
pub use decision_log_repo::DecisionLogRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use history_repo::SqliteHistoryRepository;
