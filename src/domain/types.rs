// ==========================================
// 订单行缺货处理 - 领域类型定义
// ==========================================
// 红线: 所有可枚举的业务取值都必须是封闭枚举,不允许字符串临时比较
// 序列化格式: SCREAMING_SNAKE_CASE (与历史快照/通知服务一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 订单行生命周期状态 (Line Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LineStatus {
    Sufficient,                 // 库存充足
    ShortagePendingDemandOwner, // 缺货-待需求方决策
    ShortagePendingSupplyOwner, // 缺货-待供应方计划
    Resolved,                   // 已处理
}

impl LineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineStatus::Sufficient => "SUFFICIENT",
            LineStatus::ShortagePendingDemandOwner => "SHORTAGE_PENDING_DEMAND_OWNER",
            LineStatus::ShortagePendingSupplyOwner => "SHORTAGE_PENDING_SUPPLY_OWNER",
            LineStatus::Resolved => "RESOLVED",
        }
    }

    /// 从字符串解析 (大小写不敏感)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "SUFFICIENT" => Some(LineStatus::Sufficient),
            "SHORTAGE_PENDING_DEMAND_OWNER" => Some(LineStatus::ShortagePendingDemandOwner),
            "SHORTAGE_PENDING_SUPPLY_OWNER" => Some(LineStatus::ShortagePendingSupplyOwner),
            "RESOLVED" => Some(LineStatus::Resolved),
            _ => None,
        }
    }

    /// 是否处于缺货待处理状态
    pub fn is_pending_shortage(&self) -> bool {
        matches!(
            self,
            LineStatus::ShortagePendingDemandOwner | LineStatus::ShortagePendingSupplyOwner
        )
    }
}

impl fmt::Display for LineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 组织角色 (Role)
// ==========================================
// 需求方(销售) / 供应方(采购) / 履约方(仓库)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    DemandOwner,
    SupplyOwner,
    FulfillmentOwner,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::DemandOwner => "DEMAND_OWNER",
            Role::SupplyOwner => "SUPPLY_OWNER",
            Role::FulfillmentOwner => "FULFILLMENT_OWNER",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "DEMAND_OWNER" | "SALE" => Some(Role::DemandOwner),
            "SUPPLY_OWNER" | "PURCHASE" => Some(Role::SupplyOwner),
            "FULFILLMENT_OWNER" | "WAREHOUSE" => Some(Role::FulfillmentOwner),
            _ => None,
        }
    }

    /// 通知文案中的角色称谓
    pub fn display_name(&self) -> &'static str {
        match self {
            Role::DemandOwner => "销售",
            Role::SupplyOwner => "采购",
            Role::FulfillmentOwner => "仓库",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 需求方决策类型 (Demand Decision Kind)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DemandDecisionKind {
    #[serde(alias = "ship-partial")]
    ShipPartial, // 部分发货,订单行保持开启
    #[serde(alias = "ship-and-close")]
    ShipAndClose, // 发货并关闭订单行
    #[serde(alias = "wait-for-supply")]
    WaitForSupply, // 等待补货
    #[serde(alias = "cancel")]
    Cancel, // 取消缺货数量
    #[serde(alias = "reject-report")]
    RejectReport, // 驳回仓库差异报告
}

impl DemandDecisionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DemandDecisionKind::ShipPartial => "SHIP_PARTIAL",
            DemandDecisionKind::ShipAndClose => "SHIP_AND_CLOSE",
            DemandDecisionKind::WaitForSupply => "WAIT_FOR_SUPPLY",
            DemandDecisionKind::Cancel => "CANCEL",
            DemandDecisionKind::RejectReport => "REJECT_REPORT",
        }
    }

    /// 是否为需要仓库执行的决策 (发货/取消)
    pub fn is_fulfillment_instruction(&self) -> bool {
        matches!(
            self,
            DemandDecisionKind::ShipPartial
                | DemandDecisionKind::ShipAndClose
                | DemandDecisionKind::Cancel
        )
    }
}

impl fmt::Display for DemandDecisionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 供应计划状态 (Supply Plan Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SupplyPlanStatus {
    Pending,   // 已受理,未给出到货日期
    Confirmed, // 已确认到货日期
}

impl fmt::Display for SupplyPlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SupplyPlanStatus::Pending => write!(f, "PENDING"),
            SupplyPlanStatus::Confirmed => write!(f, "CONFIRMED"),
        }
    }
}

// ==========================================
// 履约确认结果 (Confirmation Result)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfirmationResult {
    Confirmed,
    Rejected,
}

impl fmt::Display for ConfirmationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfirmationResult::Confirmed => write!(f, "CONFIRMED"),
            ConfirmationResult::Rejected => write!(f, "REJECTED"),
        }
    }
}

// ==========================================
// 差异类别 (Discrepancy Category)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscrepancyCategory {
    Inventory,  // 实物库存与系统不符
    Conversion, // 单位换算差异
    Damage,     // 破损/不合格
    Other,
}

impl DiscrepancyCategory {
    pub fn display_name(&self) -> &'static str {
        match self {
            DiscrepancyCategory::Inventory => "库存差异",
            DiscrepancyCategory::Conversion => "换算差异",
            DiscrepancyCategory::Damage => "破损差异",
            DiscrepancyCategory::Other => "其他差异",
        }
    }
}

impl fmt::Display for DiscrepancyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscrepancyCategory::Inventory => write!(f, "INVENTORY"),
            DiscrepancyCategory::Conversion => write!(f, "CONVERSION"),
            DiscrepancyCategory::Damage => write!(f, "DAMAGE"),
            DiscrepancyCategory::Other => write!(f, "OTHER"),
        }
    }
}

// ==========================================
// 差异报告处理状态 (Discrepancy Status)
// ==========================================
// 只有 OPEN 的报告参与分类优先级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscrepancyStatus {
    Open,
    Accepted,
    Rejected,
}

impl fmt::Display for DiscrepancyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscrepancyStatus::Open => write!(f, "OPEN"),
            DiscrepancyStatus::Accepted => write!(f, "ACCEPTED"),
            DiscrepancyStatus::Rejected => write!(f, "REJECTED"),
        }
    }
}

// ==========================================
// 加急请求状态 (Expedite Status)
// ==========================================
// 状态机: NONE → PENDING → {ACCEPTED, REJECTED}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpediteStatus {
    None,
    Pending,
    Accepted,
    Rejected,
}

impl ExpediteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpediteStatus::None => "NONE",
            ExpediteStatus::Pending => "PENDING",
            ExpediteStatus::Accepted => "ACCEPTED",
            ExpediteStatus::Rejected => "REJECTED",
        }
    }

    /// 终态: 不允许再转换
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExpediteStatus::Accepted | ExpediteStatus::Rejected)
    }
}

impl fmt::Display for ExpediteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 规则分组 (Rule Group)
// ==========================================
// PHASE_1: 首次交付; PHASE_N: 后续交付; EXCEPTION: 例外流程
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleGroup {
    #[serde(rename = "PHASE_1")]
    Phase1,
    #[serde(rename = "PHASE_N")]
    PhaseN,
    Exception,
}

impl RuleGroup {
    /// 按交付阶段选择规则组 (phase 从 1 开始)
    pub fn for_phase(phase: u32) -> Self {
        if phase <= 1 {
            RuleGroup::Phase1
        } else {
            RuleGroup::PhaseN
        }
    }
}

impl fmt::Display for RuleGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleGroup::Phase1 => write!(f, "PHASE_1"),
            RuleGroup::PhaseN => write!(f, "PHASE_N"),
            RuleGroup::Exception => write!(f, "EXCEPTION"),
        }
    }
}

// ==========================================
// 触发动作 (Trigger Action)
// ==========================================
// 执行器按此枚举做穷尽分派
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TriggerAction {
    Ship,
    Wait,
    Cancel,
    SupplyConfirm,
    ReportDiscrepancy,
    FulfillmentConfirm,
    FulfillmentReject,
    RejectDiscrepancy,
    ExpediteRequest,
    ExpediteAccept,
    ExpediteReject,
}

impl TriggerAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerAction::Ship => "ship",
            TriggerAction::Wait => "wait",
            TriggerAction::Cancel => "cancel",
            TriggerAction::SupplyConfirm => "supply-confirm",
            TriggerAction::ReportDiscrepancy => "report-discrepancy",
            TriggerAction::FulfillmentConfirm => "fulfillment-confirm",
            TriggerAction::FulfillmentReject => "fulfillment-reject",
            TriggerAction::RejectDiscrepancy => "reject-discrepancy",
            TriggerAction::ExpediteRequest => "expedite-request",
            TriggerAction::ExpediteAccept => "expedite-accept",
            TriggerAction::ExpediteReject => "expedite-reject",
        }
    }
}

impl fmt::Display for TriggerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 通知类型标签 (Notification Tag)
// ==========================================
// 每个标签对应一个通知构建函数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationTag {
    DemandToSupply,       // 销售 → 采购: 请求补货
    DemandToFulfillment,  // 销售 → 仓库: 发货指令
    DiscrepancyReport,    // 仓库 → 销售: 差异报告
    DiscrepancyRejected,  // 销售 → 仓库: 差异报告被驳回
    FulfillmentConfirmed, // 仓库 → 销售: 确认执行
    FulfillmentRejected,  // 仓库 → 销售: 拒绝执行
    SupplyEta,            // 采购 → 销售: 到货日期
    PickingNotice,        // 仓库 → 拣货: 拣货通知
    CancelClose,          // 取消/关闭
    ExpediteRequested,    // 销售 → 仓库: 加急请求
    ExpediteAnswered,     // 仓库 → 销售: 加急答复
}

impl NotificationTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationTag::DemandToSupply => "DEMAND_TO_SUPPLY",
            NotificationTag::DemandToFulfillment => "DEMAND_TO_FULFILLMENT",
            NotificationTag::DiscrepancyReport => "DISCREPANCY_REPORT",
            NotificationTag::DiscrepancyRejected => "DISCREPANCY_REJECTED",
            NotificationTag::FulfillmentConfirmed => "FULFILLMENT_CONFIRMED",
            NotificationTag::FulfillmentRejected => "FULFILLMENT_REJECTED",
            NotificationTag::SupplyEta => "SUPPLY_ETA",
            NotificationTag::PickingNotice => "PICKING_NOTICE",
            NotificationTag::CancelClose => "CANCEL_CLOSE",
            NotificationTag::ExpediteRequested => "EXPEDITE_REQUESTED",
            NotificationTag::ExpediteAnswered => "EXPEDITE_ANSWERED",
        }
    }

    /// 通知接收方角色
    pub fn recipient(&self) -> Role {
        match self {
            NotificationTag::DemandToSupply => Role::SupplyOwner,
            NotificationTag::DemandToFulfillment
            | NotificationTag::DiscrepancyRejected
            | NotificationTag::PickingNotice
            | NotificationTag::CancelClose
            | NotificationTag::ExpediteRequested => Role::FulfillmentOwner,
            NotificationTag::DiscrepancyReport
            | NotificationTag::FulfillmentConfirmed
            | NotificationTag::FulfillmentRejected
            | NotificationTag::SupplyEta
            | NotificationTag::ExpediteAnswered => Role::DemandOwner,
        }
    }
}

impl fmt::Display for NotificationTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 规则声明的下一状态 (Next Status)
// ==========================================
// KEEP_CURRENT: 报告类动作不改变生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NextStatus {
    Sufficient,
    ShortagePendingDemandOwner,
    ShortagePendingSupplyOwner,
    Resolved,
    KeepCurrent,
}

impl NextStatus {
    /// 结合当前状态求出转换后的状态
    pub fn resolve(&self, current: LineStatus) -> LineStatus {
        match self {
            NextStatus::Sufficient => LineStatus::Sufficient,
            NextStatus::ShortagePendingDemandOwner => LineStatus::ShortagePendingDemandOwner,
            NextStatus::ShortagePendingSupplyOwner => LineStatus::ShortagePendingSupplyOwner,
            NextStatus::Resolved => LineStatus::Resolved,
            NextStatus::KeepCurrent => current,
        }
    }
}

impl fmt::Display for NextStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NextStatus::KeepCurrent => write!(f, "KEEP_CURRENT"),
            other => write!(f, "{}", other.resolve(LineStatus::Sufficient)),
        }
    }
}

// ==========================================
// 发货关闭语义 (Close Out)
// ==========================================
// 首次交付可选择保留订单行,后续交付一律关闭
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CloseOut {
    NotApplicable,
    Optional,
    Always,
}

impl CloseOut {
    /// 根据调用方意愿求出是否关闭订单行
    pub fn closes_line(&self, requested: Option<bool>) -> bool {
        match self {
            CloseOut::NotApplicable => false,
            CloseOut::Optional => requested.unwrap_or(false),
            CloseOut::Always => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_status_round_trip_str() {
        for status in [
            LineStatus::Sufficient,
            LineStatus::ShortagePendingDemandOwner,
            LineStatus::ShortagePendingSupplyOwner,
            LineStatus::Resolved,
        ] {
            assert_eq!(LineStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(LineStatus::from_str("unknown"), None);
    }

    #[test]
    fn test_next_status_keep_current() {
        assert_eq!(
            NextStatus::KeepCurrent.resolve(LineStatus::ShortagePendingSupplyOwner),
            LineStatus::ShortagePendingSupplyOwner
        );
        assert_eq!(
            NextStatus::Resolved.resolve(LineStatus::Sufficient),
            LineStatus::Resolved
        );
    }

    #[test]
    fn test_close_out() {
        assert!(!CloseOut::Optional.closes_line(None));
        assert!(CloseOut::Optional.closes_line(Some(true)));
        assert!(CloseOut::Always.closes_line(Some(false)));
        assert!(!CloseOut::NotApplicable.closes_line(Some(true)));
    }

    #[test]
    fn test_rule_group_for_phase() {
        assert_eq!(RuleGroup::for_phase(1), RuleGroup::Phase1);
        assert_eq!(RuleGroup::for_phase(2), RuleGroup::PhaseN);
        assert_eq!(RuleGroup::for_phase(7), RuleGroup::PhaseN);
    }

    #[test]
    fn test_decision_kind_accepts_kebab_alias() {
        let kind: DemandDecisionKind = serde_json::from_str("\"ship-partial\"").unwrap();
        assert_eq!(kind, DemandDecisionKind::ShipPartial);
        assert_eq!(
            serde_json::to_string(&kind).unwrap(),
            "\"SHIP_PARTIAL\""
        );
    }

    #[test]
    fn test_trigger_action_serialized_kebab() {
        assert_eq!(
            serde_json::to_string(&TriggerAction::SupplyConfirm).unwrap(),
            "\"supply-confirm\""
        );
    }
}
