// ==========================================
// 订单行缺货处理 - 通知构建器
// ==========================================
// 职责: 订单行 + 上下文 → 结构化通知负载,每个通知族一个构建函数
// 红线: 纯函数,不做 I/O,不修改订单行
// 红线: 相同输入必须得到逐字节相同的负载 (时间戳由调用方传入)
// 红线: 仓库单位数量 = 订单单位数量 × 换算率 (两位小数)
// ==========================================

use crate::domain::notification::{NotificationDetails, NotificationPayload, QuantityBreakdown};
use crate::domain::order_line::{round2, OrderLine};
use crate::domain::types::{
    ConfirmationResult, DemandDecisionKind, ExpediteStatus, NotificationTag, RuleGroup,
    SupplyPlanStatus,
};
use chrono::{DateTime, Utc};

/// 构建上下文
#[derive(Debug, Clone, Copy)]
pub struct BuildContext<'a> {
    pub context_id: &'a str,
    pub group: RuleGroup,
    pub now: DateTime<Utc>,
}

impl<'a> BuildContext<'a> {
    pub fn new(context_id: &'a str, group: RuleGroup, now: DateTime<Utc>) -> Self {
        Self {
            context_id,
            group,
            now,
        }
    }
}

// ==========================================
// 公共辅助
// ==========================================

/// 数量摘要 (双单位)
pub fn quantity_breakdown(line: &OrderLine) -> QuantityBreakdown {
    let net_need = round2(line.net_need());
    let available = round2(line.quantity_available);
    let shortfall = round2(line.shortfall());

    QuantityBreakdown {
        order_unit: line.units.order_unit.clone(),
        warehouse_unit: line.units.warehouse_unit.clone(),
        conversion_rate: line.units.conversion_rate,
        net_need,
        net_need_warehouse: line.to_warehouse_qty(net_need),
        available,
        available_warehouse: line.to_warehouse_qty(available),
        shortfall,
        shortfall_warehouse: line.to_warehouse_qty(shortfall),
    }
}

fn fmt_qty(qty: f64) -> String {
    format!("{}", round2(qty))
}

/// 阶段措辞: 首次交付 / 第N次交付
fn phase_label(group: RuleGroup, line: &OrderLine) -> String {
    match group {
        RuleGroup::Phase1 => "首次交付".to_string(),
        RuleGroup::PhaseN => format!("第{}次交付", line.phase()),
        RuleGroup::Exception => {
            if line.phase() <= 1 {
                "首次交付".to_string()
            } else {
                format!("第{}次交付", line.phase())
            }
        }
    }
}

/// 双单位数量文案: "5箱 (60瓶)"
fn dual_qty(line: &OrderLine, order_qty: f64) -> String {
    format!(
        "{}{} ({}{})",
        fmt_qty(order_qty),
        line.units.order_unit,
        fmt_qty(line.to_warehouse_qty(order_qty)),
        line.units.warehouse_unit
    )
}

fn line_title(line: &OrderLine) -> String {
    format!("{}({})", line.name, line.product_key)
}

fn payload(
    tag: NotificationTag,
    line: &OrderLine,
    ctx: &BuildContext<'_>,
    message: String,
    details: NotificationDetails,
) -> NotificationPayload {
    NotificationPayload {
        tag,
        entity_id: line.id.clone(),
        context_id: ctx.context_id.to_string(),
        entity_name: line.name.clone(),
        product_key: line.product_key.clone(),
        message,
        details,
        timestamp: ctx.now,
    }
}

// ==========================================
// 销售 → 采购: 请求补货
// ==========================================
pub fn build_demand_to_supply(line: &OrderLine, ctx: &BuildContext<'_>) -> NotificationPayload {
    let quantities = quantity_breakdown(line);
    // 销售指定的等待数量优先,未指定时按缺口
    let requested_qty = line
        .demand_decision
        .as_ref()
        .and_then(|d| d.quantity)
        .map(round2)
        .unwrap_or(quantities.shortfall);

    let message = format!(
        "【{}】{} 缺货 {},销售选择等待补货 {},请采购确认到货日期。净需求 {},可用 {}",
        phase_label(ctx.group, line),
        line_title(line),
        dual_qty(line, quantities.shortfall),
        dual_qty(line, requested_qty),
        dual_qty(line, quantities.net_need),
        dual_qty(line, quantities.available),
    );

    let details = NotificationDetails::SupplyRequest {
        phase: line.phase(),
        requested_qty,
        requested_qty_warehouse: line.to_warehouse_qty(requested_qty),
        quantities,
    };

    payload(NotificationTag::DemandToSupply, line, ctx, message, details)
}

// ==========================================
// 销售 → 仓库: 发货指令
// ==========================================
pub fn build_demand_to_fulfillment(
    line: &OrderLine,
    ctx: &BuildContext<'_>,
) -> NotificationPayload {
    let quantities = quantity_breakdown(line);
    let (ship_qty, close_line) = match &line.demand_decision {
        Some(decision) => (
            round2(decision.quantity.unwrap_or(line.quantity_available)),
            decision.kind == DemandDecisionKind::ShipAndClose,
        ),
        None => (quantities.available, false),
    };

    let closing = if close_line {
        "发货后关闭订单行"
    } else {
        "剩余数量保留在订单行"
    };

    let message = format!(
        "【{}】{} 请按 {} 发货,{}。净需求 {},可用 {}",
        phase_label(ctx.group, line),
        line_title(line),
        dual_qty(line, ship_qty),
        closing,
        dual_qty(line, quantities.net_need),
        dual_qty(line, quantities.available),
    );

    let details = NotificationDetails::Shipment {
        phase: line.phase(),
        ship_qty,
        ship_qty_warehouse: line.to_warehouse_qty(ship_qty),
        close_line,
        quantities,
    };

    payload(NotificationTag::DemandToFulfillment, line, ctx, message, details)
}

// ==========================================
// 仓库 → 销售: 差异报告
// ==========================================
pub fn build_discrepancy_report(line: &OrderLine, ctx: &BuildContext<'_>) -> NotificationPayload {
    discrepancy_payload(NotificationTag::DiscrepancyReport, line, ctx)
}

// ==========================================
// 销售 → 仓库: 差异报告被驳回
// ==========================================
pub fn build_discrepancy_rejected(
    line: &OrderLine,
    ctx: &BuildContext<'_>,
) -> NotificationPayload {
    discrepancy_payload(NotificationTag::DiscrepancyRejected, line, ctx)
}

fn discrepancy_payload(
    tag: NotificationTag,
    line: &OrderLine,
    ctx: &BuildContext<'_>,
) -> NotificationPayload {
    let quantities = quantity_breakdown(line);

    let (actual_qty, requested_qty, category, department, reported_by) =
        match &line.discrepancy_report {
            Some(report) => (
                round2(report.actual_qty),
                round2(report.requested_qty),
                report.category,
                report.department.clone(),
                report.reported_by.clone(),
            ),
            None => (
                quantities.available,
                quantities.available,
                crate::domain::types::DiscrepancyCategory::Other,
                None,
                None,
            ),
        };
    let difference_qty = round2(requested_qty - actual_qty);

    let message = match tag {
        NotificationTag::DiscrepancyRejected => format!(
            "【{}】{} 的差异报告 (实际 {},要求 {}) 已被销售驳回",
            phase_label(ctx.group, line),
            line_title(line),
            dual_qty(line, actual_qty),
            dual_qty(line, requested_qty),
        ),
        _ => format!(
            "【{}】{} 仓库{}报告{}: 实际 {},要求 {},差异 {}",
            phase_label(ctx.group, line),
            line_title(line),
            department
                .as_deref()
                .map(|d| format!("({})", d))
                .unwrap_or_default(),
            category.display_name(),
            dual_qty(line, actual_qty),
            dual_qty(line, requested_qty),
            dual_qty(line, difference_qty),
        ),
    };

    let details = NotificationDetails::Discrepancy {
        actual_qty,
        actual_qty_warehouse: line.to_warehouse_qty(actual_qty),
        requested_qty,
        requested_qty_warehouse: line.to_warehouse_qty(requested_qty),
        difference_qty,
        difference_qty_warehouse: line.to_warehouse_qty(difference_qty),
        category,
        department,
        reported_by,
        quantities,
    };

    payload(tag, line, ctx, message, details)
}

// ==========================================
// 仓库 → 销售: 确认 / 拒绝执行
// ==========================================
pub fn build_fulfillment_response(
    line: &OrderLine,
    ctx: &BuildContext<'_>,
) -> NotificationPayload {
    let quantities = quantity_breakdown(line);
    let (result, reason) = match &line.fulfillment_confirmation {
        Some(confirmation) => (confirmation.result, confirmation.reason.clone()),
        None => (ConfirmationResult::Confirmed, None),
    };

    let (tag, message) = match result {
        ConfirmationResult::Confirmed => (
            NotificationTag::FulfillmentConfirmed,
            format!(
                "【{}】{} 仓库已确认执行,可用 {}",
                phase_label(ctx.group, line),
                line_title(line),
                dual_qty(line, quantities.available),
            ),
        ),
        ConfirmationResult::Rejected => (
            NotificationTag::FulfillmentRejected,
            format!(
                "【{}】{} 仓库拒绝执行,原因: {},请销售重新决策",
                phase_label(ctx.group, line),
                line_title(line),
                reason.as_deref().unwrap_or("未说明"),
            ),
        ),
    };

    let details = NotificationDetails::Confirmation {
        quantities,
        result,
        reason,
    };

    payload(tag, line, ctx, message, details)
}

// ==========================================
// 采购 → 销售: 到货日期
// ==========================================
pub fn build_supply_eta(line: &OrderLine, ctx: &BuildContext<'_>) -> NotificationPayload {
    let quantities = quantity_breakdown(line);
    let (plan_status, eta, supplier) = match &line.supply_plan {
        Some(plan) => (plan.status, plan.eta, plan.supplier.clone()),
        None => (SupplyPlanStatus::Pending, None, None),
    };

    let eta_text = eta
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "待定".to_string());

    let message = format!(
        "【{}】{} 缺货 {},采购计划{}: 预计到货 {}{}",
        phase_label(ctx.group, line),
        line_title(line),
        dual_qty(line, quantities.shortfall),
        match plan_status {
            SupplyPlanStatus::Confirmed => "已确认",
            SupplyPlanStatus::Pending => "待确认",
        },
        eta_text,
        supplier
            .as_deref()
            .map(|s| format!(",供应商 {}", s))
            .unwrap_or_default(),
    );

    let details = NotificationDetails::SupplyEta {
        quantities,
        plan_status,
        eta,
        supplier,
    };

    payload(NotificationTag::SupplyEta, line, ctx, message, details)
}

// ==========================================
// 仓库 → 拣货: 拣货通知
// ==========================================
pub fn build_picking_notice(line: &OrderLine, ctx: &BuildContext<'_>) -> NotificationPayload {
    let quantities = quantity_breakdown(line);
    let pick_qty = round2(line.net_need().min(line.quantity_available).max(0.0));

    let message = format!(
        "【{}】{} 拣货 {}",
        phase_label(ctx.group, line),
        line_title(line),
        dual_qty(line, pick_qty),
    );

    let details = NotificationDetails::Picking {
        pick_qty,
        pick_qty_warehouse: line.to_warehouse_qty(pick_qty),
        quantities,
    };

    payload(NotificationTag::PickingNotice, line, ctx, message, details)
}

// ==========================================
// 取消 / 关闭
// ==========================================
pub fn build_cancel_close(line: &OrderLine, ctx: &BuildContext<'_>) -> NotificationPayload {
    let quantities = quantity_breakdown(line);
    let cancel_qty = line
        .demand_decision
        .as_ref()
        .and_then(|d| d.quantity)
        .map(round2)
        .unwrap_or(quantities.net_need);

    let message = format!(
        "【{}】{} 销售取消 {},订单行关闭",
        phase_label(ctx.group, line),
        line_title(line),
        dual_qty(line, cancel_qty),
    );

    let details = NotificationDetails::Cancellation {
        phase: line.phase(),
        cancel_qty,
        cancel_qty_warehouse: line.to_warehouse_qty(cancel_qty),
        quantities,
    };

    payload(NotificationTag::CancelClose, line, ctx, message, details)
}

// ==========================================
// 加急: 请求 / 答复
// ==========================================
pub fn build_expedite(line: &OrderLine, ctx: &BuildContext<'_>) -> NotificationPayload {
    let quantities = quantity_breakdown(line);
    let (status, target_date, reason) = match &line.expedite_request {
        Some(request) => (request.status, request.target_date, request.reason.clone()),
        None => (ExpediteStatus::None, None, None),
    };

    let due_text = line
        .due_date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "未定".to_string());

    let (tag, message) = match status {
        ExpediteStatus::Accepted | ExpediteStatus::Rejected => (
            NotificationTag::ExpediteAnswered,
            format!(
                "{} 加急请求已{} (原交付日期 {}){}",
                line_title(line),
                if status == ExpediteStatus::Accepted {
                    "接受"
                } else {
                    "拒绝"
                },
                due_text,
                reason
                    .as_deref()
                    .map(|r| format!(",原因: {}", r))
                    .unwrap_or_default(),
            ),
        ),
        ExpediteStatus::None | ExpediteStatus::Pending => (
            NotificationTag::ExpediteRequested,
            format!(
                "{} 销售请求提前交付: 原交付日期 {},期望 {},可用 {}",
                line_title(line),
                due_text,
                target_date
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| "尽快".to_string()),
                dual_qty(line, quantities.available),
            ),
        ),
    };

    let details = NotificationDetails::Expedite {
        quantities,
        status,
        due_date: line.due_date,
        target_date,
        reason,
    };

    payload(tag, line, ctx, message, details)
}

// ==========================================
// 按通知标签选择构建函数
// ==========================================
pub fn build_for_tag(
    tag: NotificationTag,
    line: &OrderLine,
    ctx: &BuildContext<'_>,
) -> NotificationPayload {
    match tag {
        NotificationTag::DemandToSupply => build_demand_to_supply(line, ctx),
        NotificationTag::DemandToFulfillment => build_demand_to_fulfillment(line, ctx),
        NotificationTag::DiscrepancyReport => build_discrepancy_report(line, ctx),
        NotificationTag::DiscrepancyRejected => build_discrepancy_rejected(line, ctx),
        NotificationTag::FulfillmentConfirmed | NotificationTag::FulfillmentRejected => {
            build_fulfillment_response(line, ctx)
        }
        NotificationTag::SupplyEta => build_supply_eta(line, ctx),
        NotificationTag::PickingNotice => build_picking_notice(line, ctx),
        NotificationTag::CancelClose => build_cancel_close(line, ctx),
        NotificationTag::ExpediteRequested | NotificationTag::ExpediteAnswered => {
            build_expedite(line, ctx)
        }
    }
}
