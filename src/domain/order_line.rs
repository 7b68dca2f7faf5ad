// ==========================================
// 订单行缺货处理 - 订单行领域模型
// ==========================================
// 红线: 派生数量 (净需求/缺口/阶段) 只能计算,不允许持久化
// 红线: 双单位一致 warehouse_qty = order_qty × conversion_rate
// ==========================================

use crate::domain::types::{
    ConfirmationResult, DemandDecisionKind, DiscrepancyCategory, DiscrepancyStatus,
    ExpediteStatus, LineStatus, SupplyPlanStatus,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// 保留两位小数
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ==========================================
// UnitConversion - 订单单位与仓库单位换算
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitConversion {
    pub order_unit: String,     // 订单单位 (如: 箱)
    pub warehouse_unit: String, // 仓库单位 (如: 瓶)
    pub conversion_rate: f64,   // 1 订单单位 = rate 仓库单位
}

impl UnitConversion {
    pub fn new(order_unit: &str, warehouse_unit: &str, conversion_rate: f64) -> Self {
        Self {
            order_unit: order_unit.to_string(),
            warehouse_unit: warehouse_unit.to_string(),
            conversion_rate,
        }
    }

    /// 订单单位数量 → 仓库单位数量 (两位小数)
    pub fn to_warehouse(&self, order_qty: f64) -> f64 {
        round2(order_qty * self.conversion_rate)
    }
}

impl Default for UnitConversion {
    fn default() -> Self {
        Self::new("PCS", "PCS", 1.0)
    }
}

// ==========================================
// 决策槽位
// ==========================================

/// 需求方决策
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DemandDecision {
    pub kind: DemandDecisionKind,
    #[serde(default)]
    pub quantity: Option<f64>, // 发货/取消数量 (订单单位)
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub decided_by: Option<String>,
    #[serde(default)]
    pub decided_at: Option<DateTime<Utc>>,
}

impl DemandDecision {
    pub fn of_kind(kind: DemandDecisionKind) -> Self {
        Self {
            kind,
            quantity: None,
            note: None,
            decided_by: None,
            decided_at: None,
        }
    }
}

/// 供应方计划
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplyPlan {
    pub status: SupplyPlanStatus,
    #[serde(default)]
    pub eta: Option<NaiveDate>,
    #[serde(default)]
    pub supplier: Option<String>,
    #[serde(default)]
    pub planned_by: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// 履约方确认
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FulfillmentConfirmation {
    pub result: ConfirmationResult,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub confirmed_by: Option<String>,
    #[serde(default)]
    pub confirmed_at: Option<DateTime<Utc>>,
}

/// 履约方差异报告 (双单位)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscrepancyReport {
    pub actual_qty: f64,              // 实际可发数量 (订单单位)
    pub requested_qty: f64,           // 要求数量 (订单单位)
    pub actual_warehouse_qty: f64,    // 实际可发数量 (仓库单位)
    pub requested_warehouse_qty: f64, // 要求数量 (仓库单位)
    pub category: DiscrepancyCategory,
    pub status: DiscrepancyStatus,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub reported_by: Option<String>,
    #[serde(default)]
    pub reported_at: Option<DateTime<Utc>>,
}

impl DiscrepancyReport {
    pub fn is_open(&self) -> bool {
        self.status == DiscrepancyStatus::Open
    }

    /// 差异数量 (要求 - 实际, 订单单位)
    pub fn difference_qty(&self) -> f64 {
        round2(self.requested_qty - self.actual_qty)
    }
}

/// 加急请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpediteRequest {
    pub status: ExpediteStatus,
    #[serde(default)]
    pub target_date: Option<NaiveDate>,
    #[serde(default)]
    pub requested_by: Option<String>,
    #[serde(default)]
    pub requested_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub answered_by: Option<String>,
    #[serde(default)]
    pub answered_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reason: Option<String>,
}

// ==========================================
// OrderLine - 订单行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    // ===== 标识 =====
    pub id: String,          // 跨会话稳定的不透明ID
    pub name: String,        // 显示名称
    pub product_key: String, // 产品编码

    // ===== 数量 (订单单位) =====
    pub quantity_ordered: f64,
    pub quantity_delivered: f64,
    pub quantity_available: f64,

    // ===== 交付序列 =====
    pub delivery_count: u32,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,

    // ===== 生命周期 =====
    pub status: LineStatus,

    // ===== 单位 =====
    #[serde(default)]
    pub units: UnitConversion,

    // ===== 决策槽位 (各自可选) =====
    #[serde(default, alias = "saleDecision")]
    pub demand_decision: Option<DemandDecision>,
    #[serde(default)]
    pub supply_plan: Option<SupplyPlan>,
    #[serde(default)]
    pub fulfillment_confirmation: Option<FulfillmentConfirmation>,
    #[serde(default)]
    pub discrepancy_report: Option<DiscrepancyReport>,
    #[serde(default)]
    pub expedite_request: Option<ExpediteRequest>,
}

impl OrderLine {
    /// 创建无决策的订单行,状态按数量推导
    pub fn new(
        id: &str,
        name: &str,
        product_key: &str,
        quantity_ordered: f64,
        quantity_delivered: f64,
        quantity_available: f64,
    ) -> Self {
        let mut line = Self {
            id: id.to_string(),
            name: name.to_string(),
            product_key: product_key.to_string(),
            quantity_ordered,
            quantity_delivered,
            quantity_available,
            delivery_count: 0,
            due_date: None,
            status: LineStatus::Sufficient,
            units: UnitConversion::default(),
            demand_decision: None,
            supply_plan: None,
            fulfillment_confirmation: None,
            discrepancy_report: None,
            expedite_request: None,
        };
        line.status = line.intrinsic_status();
        line
    }

    // ==========================================
    // 派生数量
    // ==========================================

    /// 净需求 = 订购 - 已交付
    pub fn net_need(&self) -> f64 {
        self.quantity_ordered - self.quantity_delivered
    }

    /// 缺口 = max(0, 净需求 - 可用)
    pub fn shortfall(&self) -> f64 {
        (self.net_need() - self.quantity_available).max(0.0)
    }

    /// 交付阶段 (从 1 开始)
    pub fn phase(&self) -> u32 {
        self.delivery_count + 1
    }

    /// 仅由数量推导的初始状态 (无任何决策时)
    pub fn intrinsic_status(&self) -> LineStatus {
        if self.shortfall() > 0.0 {
            LineStatus::ShortagePendingDemandOwner
        } else {
            LineStatus::Sufficient
        }
    }

    // ==========================================
    // 标志
    // ==========================================

    pub fn has_open_discrepancy(&self) -> bool {
        self.discrepancy_report
            .as_ref()
            .map(|r| r.is_open())
            .unwrap_or(false)
    }

    pub fn expedite_status(&self) -> ExpediteStatus {
        self.expedite_request
            .as_ref()
            .map(|r| r.status)
            .unwrap_or(ExpediteStatus::None)
    }

    /// 交付日期晚于今天
    pub fn is_future_dated(&self, today: NaiveDate) -> bool {
        self.due_date.map(|d| d > today).unwrap_or(false)
    }

    /// 可加急: 未处理完、未来交付、理论库存充足
    pub fn is_expedite_eligible(&self, today: NaiveDate) -> bool {
        self.status != LineStatus::Resolved
            && self.is_future_dated(today)
            && self.shortfall() <= 0.0
    }

    /// 供应计划已确认且到货不晚于交付日期
    pub fn is_plan_sufficient(&self) -> bool {
        match &self.supply_plan {
            Some(plan) if plan.status == SupplyPlanStatus::Confirmed => {
                match (plan.eta, self.due_date) {
                    (Some(eta), Some(due)) => eta <= due,
                    (Some(_), None) => true,
                    (None, _) => false,
                }
            }
            _ => false,
        }
    }

    /// 订单单位数量 → 仓库单位数量
    pub fn to_warehouse_qty(&self, order_qty: f64) -> f64 {
        self.units.to_warehouse(order_qty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_quantities() {
        let line = OrderLine::new("L1", "矿泉水", "P-001", 10.0, 2.0, 5.0);
        assert_eq!(line.net_need(), 8.0);
        assert_eq!(line.shortfall(), 3.0);
        assert_eq!(line.phase(), 1);
        assert_eq!(line.status, LineStatus::ShortagePendingDemandOwner);
    }

    #[test]
    fn test_shortfall_never_negative() {
        let line = OrderLine::new("L1", "矿泉水", "P-001", 10.0, 0.0, 50.0);
        assert_eq!(line.shortfall(), 0.0);
        assert_eq!(line.status, LineStatus::Sufficient);
    }

    #[test]
    fn test_unit_conversion_two_decimals() {
        let units = UnitConversion::new("箱", "瓶", 12.333);
        assert_eq!(units.to_warehouse(3.0), 37.0);
        assert_eq!(units.to_warehouse(1.0), 12.33);
    }

    #[test]
    fn test_expedite_eligibility() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let mut line = OrderLine::new("L1", "矿泉水", "P-001", 10.0, 0.0, 10.0);
        assert!(!line.is_expedite_eligible(today));

        line.due_date = NaiveDate::from_ymd_opt(2026, 3, 5);
        assert!(line.is_expedite_eligible(today));

        line.quantity_available = 4.0;
        assert!(!line.is_expedite_eligible(today));
    }

    #[test]
    fn test_plan_sufficiency() {
        let mut line = OrderLine::new("L1", "矿泉水", "P-001", 10.0, 0.0, 4.0);
        line.due_date = NaiveDate::from_ymd_opt(2026, 3, 10);
        assert!(!line.is_plan_sufficient());

        line.supply_plan = Some(SupplyPlan {
            status: SupplyPlanStatus::Confirmed,
            eta: NaiveDate::from_ymd_opt(2026, 3, 8),
            supplier: None,
            planned_by: None,
            updated_at: None,
        });
        assert!(line.is_plan_sufficient());

        if let Some(plan) = line.supply_plan.as_mut() {
            plan.eta = NaiveDate::from_ymd_opt(2026, 3, 12);
        }
        assert!(!line.is_plan_sufficient());
    }
}
