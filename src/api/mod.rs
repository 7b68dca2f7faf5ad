// ==========================================
// 订单行缺货处理 - API 层
// ==========================================
// 职责: 提供工作流 API,串联数据源/引擎/仓储
// ==========================================

pub mod error;
pub mod line_source;
pub mod workflow_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use line_source::{InMemoryOrderLineSource, OrderLineSource};
pub use workflow_api::{WorkflowApi, WorkingSet};
