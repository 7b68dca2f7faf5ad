// ==========================================
// 订单行缺货处理 - 决策日志数据仓储
// ==========================================
// 对齐: decision_log 表
// 红线: 只追加; 不提供更新/删除
// ==========================================

mod core;
mod queries;


pub use core::DecisionLogRepository;
