// ==========================================
// 订单行缺货处理 - 通知负载
// ==========================================
// 生命周期: 每次状态转换构建一次,发送一次,核心层不重试
// ==========================================

use crate::domain::types::{
    ConfirmationResult, DiscrepancyCategory, ExpediteStatus, NotificationTag, SupplyPlanStatus,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// 通知负载 (POST 到外部通知服务的请求体)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    pub tag: NotificationTag,
    pub entity_id: String,
    pub context_id: String,
    pub entity_name: String,
    pub product_key: String,
    pub message: String,
    pub details: NotificationDetails,
    pub timestamp: DateTime<Utc>,
}

/// 数量摘要 (订单单位 + 仓库单位)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuantityBreakdown {
    pub order_unit: String,
    pub warehouse_unit: String,
    pub conversion_rate: f64,
    pub net_need: f64,
    pub net_need_warehouse: f64,
    pub available: f64,
    pub available_warehouse: f64,
    pub shortfall: f64,
    pub shortfall_warehouse: f64,
}

/// 按通知类型区分的明细
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationDetails {
    #[serde(rename_all = "camelCase")]
    Shipment {
        quantities: QuantityBreakdown,
        phase: u32,
        ship_qty: f64,
        ship_qty_warehouse: f64,
        close_line: bool,
    },
    #[serde(rename_all = "camelCase")]
    SupplyRequest {
        quantities: QuantityBreakdown,
        phase: u32,
        requested_qty: f64,
        requested_qty_warehouse: f64,
    },
    #[serde(rename_all = "camelCase")]
    Discrepancy {
        quantities: QuantityBreakdown,
        actual_qty: f64,
        actual_qty_warehouse: f64,
        requested_qty: f64,
        requested_qty_warehouse: f64,
        difference_qty: f64,
        difference_qty_warehouse: f64,
        category: DiscrepancyCategory,
        department: Option<String>,
        reported_by: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Confirmation {
        quantities: QuantityBreakdown,
        result: ConfirmationResult,
        reason: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    SupplyEta {
        quantities: QuantityBreakdown,
        plan_status: SupplyPlanStatus,
        eta: Option<NaiveDate>,
        supplier: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Picking {
        quantities: QuantityBreakdown,
        pick_qty: f64,
        pick_qty_warehouse: f64,
    },
    #[serde(rename_all = "camelCase")]
    Cancellation {
        quantities: QuantityBreakdown,
        phase: u32,
        cancel_qty: f64,
        cancel_qty_warehouse: f64,
    },
    #[serde(rename_all = "camelCase")]
    Expedite {
        quantities: QuantityBreakdown,
        status: ExpediteStatus,
        due_date: Option<NaiveDate>,
        target_date: Option<NaiveDate>,
        reason: Option<String>,
    },
}

impl NotificationDetails {
    pub fn quantities(&self) -> &QuantityBreakdown {
        match self {
            NotificationDetails::Shipment { quantities, .. }
            | NotificationDetails::SupplyRequest { quantities, .. }
            | NotificationDetails::Discrepancy { quantities, .. }
            | NotificationDetails::Confirmation { quantities, .. }
            | NotificationDetails::SupplyEta { quantities, .. }
            | NotificationDetails::Picking { quantities, .. }
            | NotificationDetails::Cancellation { quantities, .. }
            | NotificationDetails::Expedite { quantities, .. } => quantities,
        }
    }
}
