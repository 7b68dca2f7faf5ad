// ==========================================
// 订单行缺货处理 - 核心库
// ==========================================
// 角色: 需求方(销售) / 供应方(采购) / 履约方(仓库)
// 定位: 声明式规则驱动的缺货处理工作流引擎
// 技术栈: Rust + SQLite + HTTP 通知
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 历史快照与决策日志
pub mod repository;

// 引擎层 - 规则、转换、通知、合并、分桶
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 工作流接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    DemandDecisionKind, ExpediteStatus, LineStatus, NotificationTag, Role, RuleGroup,
    TriggerAction,
};

// 领域实体
pub use domain::{
    DecisionLogEntry, HistorySnapshot, NotificationPayload, OrderLine, Rule, UnitConversion,
};

// 引擎
pub use engine::{
    Classification, EngineError, HistoryReconciler, NotificationDispatcher, RoleClassifier,
    RuleCatalog, TransitionExecutor, TransitionOutcome, TransitionParams,
};

// API
pub use api::{ApiError, InMemoryOrderLineSource, OrderLineSource, WorkflowApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "订单行缺货处理";
