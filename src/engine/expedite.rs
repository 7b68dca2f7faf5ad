// ==========================================
// 订单行缺货处理 - 加急子流程状态机
// ==========================================
// 状态: NONE → PENDING → {ACCEPTED, REJECTED} (终态)
// NONE → PENDING: 销售发起,仅限未来交付且理论库存充足
// PENDING → ACCEPTED | REJECTED: 仓库答复
// 终态之后不允许任何转换 (驳回后再次请求不在范围内)
// ==========================================

use crate::domain::order_line::OrderLine;
use crate::domain::types::ExpediteStatus;
use crate::engine::error::{EngineError, EngineResult};
use chrono::NaiveDate;

pub struct ExpediteMachine;

impl ExpediteMachine {
    /// 转换是否合法
    pub fn can_transition(from: ExpediteStatus, to: ExpediteStatus) -> bool {
        matches!(
            (from, to),
            (ExpediteStatus::None, ExpediteStatus::Pending)
                | (ExpediteStatus::Pending, ExpediteStatus::Accepted)
                | (ExpediteStatus::Pending, ExpediteStatus::Rejected)
        )
    }

    /// 执行转换,非法时返回 `InvalidExpediteTransition`
    pub fn transition(from: ExpediteStatus, to: ExpediteStatus) -> EngineResult<ExpediteStatus> {
        if Self::can_transition(from, to) {
            Ok(to)
        } else {
            Err(EngineError::InvalidExpediteTransition { from, to })
        }
    }
}

/// 订单行是否可发起加急
pub fn is_eligible(line: &OrderLine, today: NaiveDate) -> bool {
    line.is_expedite_eligible(today)
}

/// 分类器不参与常规分桶、交由加急子流程处理的订单行
///
/// 有未处理差异报告的订单行始终归差异桶,不在此列
pub fn expedite_candidates(lines: &[OrderLine], today: NaiveDate) -> Vec<OrderLine> {
    lines
        .iter()
        .filter(|line| is_withheld_for_expedite(line, today))
        .cloned()
        .collect()
}

/// 加急流程未结束的可加急订单行
pub(crate) fn is_withheld_for_expedite(line: &OrderLine, today: NaiveDate) -> bool {
    !line.has_open_discrepancy()
        && is_eligible(line, today)
        && !line.expedite_status().is_terminal()
}
