// ==========================================
// 订单行缺货处理 - 领域模型层
// ==========================================
// 职责: 定义领域实体、封闭枚举、历史快照与通知负载
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod decision_log;
pub mod history;
pub mod notification;
pub mod order_line;
pub mod rule;
pub mod types;

// 重导出核心类型
pub use decision_log::DecisionLogEntry;
pub use history::{normalize_line_id, HistoryContext, HistoryEntry, HistorySnapshot};
pub use notification::{NotificationDetails, NotificationPayload, QuantityBreakdown};
pub use order_line::{
    round2, DemandDecision, DiscrepancyReport, ExpediteRequest, FulfillmentConfirmation,
    OrderLine, SupplyPlan, UnitConversion,
};
pub use rule::Rule;
pub use types::{
    CloseOut, ConfirmationResult, DemandDecisionKind, DiscrepancyCategory, DiscrepancyStatus,
    ExpediteStatus, LineStatus, NextStatus, NotificationTag, Role, RuleGroup, SupplyPlanStatus,
    TriggerAction,
};
