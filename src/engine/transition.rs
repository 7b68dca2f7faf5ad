// ==========================================
// 订单行缺货处理 - 状态转换归约
// ==========================================
// 职责: (规则, 订单行, 参数) → 新订单行 (只写决策槽位)
// 红线: 输入订单行不可修改,返回新值供调用方比较前后差异
// 红线: 每个动作只写自己拥有的槽位; 仅在规则明确取代旧决策时清空
// 说明: 生命周期状态由执行器在通知分发后统一落定
// ==========================================

use crate::domain::order_line::{
    round2, DemandDecision, DiscrepancyReport, ExpediteRequest, FulfillmentConfirmation,
    OrderLine, SupplyPlan,
};
use crate::domain::rule::Rule;
use crate::domain::types::{
    ConfirmationResult, DemandDecisionKind, DiscrepancyCategory, DiscrepancyStatus,
    ExpediteStatus, SupplyPlanStatus, TriggerAction,
};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::expedite::{self, ExpediteMachine};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// TransitionParams - 动作参数
// ==========================================
// 各动作只读取自己关心的字段,其余忽略
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionParams {
    // ===== 通用 =====
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    // ===== 发货 / 取消 =====
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close_line: Option<bool>,

    // ===== 供应计划 =====
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eta: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier: Option<String>,

    // ===== 差异报告 =====
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_qty: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_qty: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<DiscrepancyCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,

    // ===== 加急 =====
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_date: Option<NaiveDate>,
}

impl TransitionParams {
    pub fn with_quantity(quantity: f64) -> Self {
        Self {
            quantity: Some(quantity),
            ..Default::default()
        }
    }
}

// ==========================================
// 默认数量
// ==========================================

/// 发货默认数量: 未处理差异报告的实际数量,否则为可用量
pub fn default_ship_quantity(line: &OrderLine) -> f64 {
    match &line.discrepancy_report {
        Some(report) if report.is_open() => report.actual_qty,
        _ => line.quantity_available,
    }
}

/// 取消默认数量: 全部净需求
pub fn default_cancel_quantity(line: &OrderLine) -> f64 {
    line.net_need()
}

// ==========================================
// 归约
// ==========================================

/// 按规则的触发动作写入决策槽位,返回新的订单行
///
/// # 错误
/// - `InvalidExpediteTransition`: 加急状态机不允许该转换
/// - `ExpediteNotEligible`: 发起加急时订单行不满足条件
pub fn apply_action(
    rule: &Rule,
    line: &OrderLine,
    params: &TransitionParams,
    now: DateTime<Utc>,
) -> EngineResult<OrderLine> {
    let mut next = line.clone();

    match rule.action {
        TriggerAction::Ship => {
            let closes = rule.close_out.closes_line(params.close_line);
            let quantity = params.quantity.unwrap_or_else(|| default_ship_quantity(line));
            let kind = if closes {
                DemandDecisionKind::ShipAndClose
            } else {
                DemandDecisionKind::ShipPartial
            };

            next.demand_decision = Some(demand_decision(kind, Some(quantity), params, now));
            // 新的发货指令取代旧计划与旧回执
            next.supply_plan = None;
            next.fulfillment_confirmation = None;
            settle_open_report(&mut next, DiscrepancyStatus::Accepted);
        }
        TriggerAction::Wait => {
            let quantity = params.quantity.unwrap_or_else(|| line.shortfall());
            next.demand_decision = Some(demand_decision(
                DemandDecisionKind::WaitForSupply,
                Some(quantity),
                params,
                now,
            ));
            // 清空旧计划,等待采购重新录入
            next.supply_plan = None;
        }
        TriggerAction::Cancel => {
            let quantity = params
                .quantity
                .unwrap_or_else(|| default_cancel_quantity(line));
            next.demand_decision = Some(demand_decision(
                DemandDecisionKind::Cancel,
                Some(quantity),
                params,
                now,
            ));
            next.supply_plan = None;
            next.fulfillment_confirmation = None;
            settle_open_report(&mut next, DiscrepancyStatus::Accepted);
        }
        TriggerAction::SupplyConfirm => {
            let status = if params.eta.is_some() {
                SupplyPlanStatus::Confirmed
            } else {
                SupplyPlanStatus::Pending
            };
            next.supply_plan = Some(SupplyPlan {
                status,
                eta: params.eta,
                supplier: params.supplier.clone(),
                planned_by: params.actor.clone(),
                updated_at: Some(now),
            });
        }
        TriggerAction::ReportDiscrepancy => {
            let actual_qty = params.actual_qty.unwrap_or(line.quantity_available);
            let requested_qty = params
                .requested_qty
                .or_else(|| line.demand_decision.as_ref().and_then(|d| d.quantity))
                .unwrap_or_else(|| line.net_need());

            next.discrepancy_report = Some(DiscrepancyReport {
                actual_qty,
                requested_qty,
                actual_warehouse_qty: line.to_warehouse_qty(actual_qty),
                requested_warehouse_qty: line.to_warehouse_qty(requested_qty),
                category: params.category.unwrap_or(DiscrepancyCategory::Other),
                status: DiscrepancyStatus::Open,
                department: params.department.clone(),
                reported_by: params.actor.clone(),
                reported_at: Some(now),
            });
        }
        TriggerAction::FulfillmentConfirm => {
            next.fulfillment_confirmation =
                Some(fulfillment_confirmation(ConfirmationResult::Confirmed, params, now));
        }
        TriggerAction::FulfillmentReject => {
            next.fulfillment_confirmation =
                Some(fulfillment_confirmation(ConfirmationResult::Rejected, params, now));
        }
        TriggerAction::RejectDiscrepancy => {
            next.demand_decision = Some(demand_decision(
                DemandDecisionKind::RejectReport,
                None,
                params,
                now,
            ));
            settle_open_report(&mut next, DiscrepancyStatus::Rejected);
        }
        TriggerAction::ExpediteRequest => {
            ExpediteMachine::transition(line.expedite_status(), ExpediteStatus::Pending)?;
            if !expedite::is_eligible(line, now.date_naive()) {
                return Err(EngineError::ExpediteNotEligible {
                    line_id: line.id.clone(),
                });
            }
            next.expedite_request = Some(ExpediteRequest {
                status: ExpediteStatus::Pending,
                target_date: params.target_date,
                requested_by: params.actor.clone(),
                requested_at: Some(now),
                answered_by: None,
                answered_at: None,
                reason: params.note.clone(),
            });
        }
        TriggerAction::ExpediteAccept => {
            answer_expedite(&mut next, ExpediteStatus::Accepted, params, now)?;
        }
        TriggerAction::ExpediteReject => {
            answer_expedite(&mut next, ExpediteStatus::Rejected, params, now)?;
        }
    }

    Ok(next)
}

fn demand_decision(
    kind: DemandDecisionKind,
    quantity: Option<f64>,
    params: &TransitionParams,
    now: DateTime<Utc>,
) -> DemandDecision {
    DemandDecision {
        kind,
        quantity: quantity.map(round2),
        note: params.note.clone(),
        decided_by: params.actor.clone(),
        decided_at: Some(now),
    }
}

fn fulfillment_confirmation(
    result: ConfirmationResult,
    params: &TransitionParams,
    now: DateTime<Utc>,
) -> FulfillmentConfirmation {
    FulfillmentConfirmation {
        result,
        reason: params.reason.clone(),
        confirmed_by: params.actor.clone(),
        confirmed_at: Some(now),
    }
}

/// 结清未处理的差异报告 (已结清的报告保持原状)
fn settle_open_report(line: &mut OrderLine, status: DiscrepancyStatus) {
    if let Some(report) = line.discrepancy_report.as_mut() {
        if report.is_open() {
            report.status = status;
        }
    }
}

fn answer_expedite(
    line: &mut OrderLine,
    to: ExpediteStatus,
    params: &TransitionParams,
    now: DateTime<Utc>,
) -> EngineResult<()> {
    let from = line.expedite_status();
    ExpediteMachine::transition(from, to)?;

    if let Some(request) = line.expedite_request.as_mut() {
        request.status = to;
        request.answered_by = params.actor.clone();
        request.answered_at = Some(now);
        request.reason = params.reason.clone().or_else(|| request.reason.clone());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::rule_catalog::RuleCatalog;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap()
    }

    fn shortage_line() -> OrderLine {
        OrderLine::new("L-1", "矿泉水", "P-001", 10.0, 0.0, 5.0)
    }

    #[test]
    fn test_ship_defaults_to_available() {
        let catalog = RuleCatalog::builtin();
        let rule = catalog.require("P1-SHIP").unwrap();
        let next = apply_action(rule, &shortage_line(), &TransitionParams::default(), now()).unwrap();

        let decision = next.demand_decision.unwrap();
        assert_eq!(decision.kind, DemandDecisionKind::ShipPartial);
        assert_eq!(decision.quantity, Some(5.0));
    }

    #[test]
    fn test_ship_defaults_to_reported_quantity() {
        let catalog = RuleCatalog::builtin();
        let report = catalog.require("P1-REPORT-DISCREPANCY").unwrap();
        let params = TransitionParams {
            actual_qty: Some(3.0),
            ..Default::default()
        };
        let reported = apply_action(report, &shortage_line(), &params, now()).unwrap();

        let ship = catalog.require("P1-SHIP").unwrap();
        let shipped = apply_action(ship, &reported, &TransitionParams::default(), now()).unwrap();
        assert_eq!(shipped.demand_decision.unwrap().quantity, Some(3.0));
        assert_eq!(
            shipped.discrepancy_report.unwrap().status,
            DiscrepancyStatus::Accepted
        );
    }

    #[test]
    fn test_phase_n_ship_always_closes() {
        let catalog = RuleCatalog::builtin();
        let rule = catalog.require("PN-SHIP").unwrap();
        let params = TransitionParams {
            close_line: Some(false),
            ..Default::default()
        };
        let next = apply_action(rule, &shortage_line(), &params, now()).unwrap();
        assert_eq!(
            next.demand_decision.unwrap().kind,
            DemandDecisionKind::ShipAndClose
        );
    }

    #[test]
    fn test_cancel_defaults_to_net_need() {
        let catalog = RuleCatalog::builtin();
        let rule = catalog.require("P1-CANCEL").unwrap();
        let mut line = shortage_line();
        line.quantity_delivered = 4.0;
        let next = apply_action(rule, &line, &TransitionParams::default(), now()).unwrap();
        assert_eq!(next.demand_decision.unwrap().quantity, Some(6.0));
    }

    #[test]
    fn test_input_line_untouched() {
        let catalog = RuleCatalog::builtin();
        let rule = catalog.require("P1-WAIT").unwrap();
        let line = shortage_line();
        let before = line.clone();
        let _ = apply_action(rule, &line, &TransitionParams::default(), now()).unwrap();
        assert_eq!(line, before);
    }

    #[test]
    fn test_supply_confirm_without_eta_is_pending() {
        let catalog = RuleCatalog::builtin();
        let rule = catalog.require("P1-SUPPLY-CONFIRM").unwrap();
        let next = apply_action(rule, &shortage_line(), &TransitionParams::default(), now()).unwrap();
        assert_eq!(next.supply_plan.unwrap().status, SupplyPlanStatus::Pending);
    }

    #[test]
    fn test_expedite_request_requires_eligibility() {
        let catalog = RuleCatalog::builtin();
        let rule = catalog.require("EX-EXPEDITE-REQUEST").unwrap();
        let err = apply_action(rule, &shortage_line(), &TransitionParams::default(), now())
            .unwrap_err();
        assert!(matches!(err, EngineError::ExpediteNotEligible { .. }));
    }
}
