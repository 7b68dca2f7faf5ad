// ==========================================
// 订单行缺货处理 - 引擎层
// ==========================================
// 职责: 规则目录、状态转换、通知构建/分发、历史合并、角色分桶
// 红线: Engine 不拼 SQL, 不做持久化
// 红线: 新业务场景只能通过新增规则表达,执行器不按临时条件分支
// ==========================================

pub mod classifier;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod executor;
pub mod expedite;
pub mod notification_builder;
pub mod reconciler;
pub mod rule_catalog;
pub mod transition;

// 重导出核心类型
pub use classifier::{Bucket, Classification, RoleClassifier};
pub use dispatcher::{
    DeliveryPolicy, HttpDispatchConfig, HttpNotificationDispatcher, NoOpDispatcher,
    NotificationDispatcher, RecordingDispatcher, DEFAULT_SOFT_SUCCESS_STATUSES,
};
pub use error::{EngineError, EngineResult};
pub use events::{
    ChannelFailureSink, DispatchFailureEvent, DispatchFailureSink, NoOpFailureSink,
    OptionalFailureSink,
};
pub use executor::{TransitionExecutor, TransitionOutcome};
pub use expedite::{expedite_candidates, ExpediteMachine};
pub use notification_builder::{build_for_tag, BuildContext};
pub use reconciler::HistoryReconciler;
pub use rule_catalog::RuleCatalog;
pub use transition::TransitionParams;
