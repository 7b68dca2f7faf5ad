// ==========================================
// 订单行缺货处理 - 角色分桶
// ==========================================
// 输出: 差异 / 缺货 / 充足 三个桶
// 红线: 三个桶两两不相交,并集是输入的子集 (可排除,不可重复)
// 红线: 未处理差异报告对所有角色优先归入差异桶
// 红线: 纯函数,"今天" 由调用方传入
// 排序: 缺货桶内缺口 > 0 的在前,其余保持原顺序 (稳定排序)
// ==========================================

use crate::domain::order_line::OrderLine;
use crate::domain::types::{DemandDecisionKind, ExpediteStatus, LineStatus, Role};
use crate::engine::expedite::is_withheld_for_expedite;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, instrument};

// ==========================================
// Bucket / Classification
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Discrepancy,
    Shortage,
    Sufficient,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub discrepancy: Vec<OrderLine>,
    pub shortage: Vec<OrderLine>,
    pub sufficient: Vec<OrderLine>,
}

impl Classification {
    /// 三个桶的订单行总数
    pub fn len(&self) -> usize {
        self.discrepancy.len() + self.shortage.len() + self.sufficient.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 订单行所在的桶 (未归入任何桶时为 None)
    pub fn bucket_of(&self, line_id: &str) -> Option<Bucket> {
        let contains = |lines: &[OrderLine]| lines.iter().any(|l| l.id == line_id);
        if contains(&self.discrepancy) {
            Some(Bucket::Discrepancy)
        } else if contains(&self.shortage) {
            Some(Bucket::Shortage)
        } else if contains(&self.sufficient) {
            Some(Bucket::Sufficient)
        } else {
            None
        }
    }
}

// ==========================================
// RoleClassifier
// ==========================================
pub struct RoleClassifier;

impl RoleClassifier {
    /// 按角色分桶
    ///
    /// # 参数
    /// - role: 当前操作角色
    /// - is_originator: 该角色是否为请求发起方 (否则为处理方)
    /// - today: 用于交付日期比较
    #[instrument(skip_all, fields(total = lines.len(), role = %role, is_originator = %is_originator))]
    pub fn classify(
        lines: &[OrderLine],
        role: Role,
        is_originator: bool,
        today: NaiveDate,
    ) -> Classification {
        let mut result = Classification::default();

        for line in lines {
            let bucket = if is_originator {
                Self::route_originator(line, today)
            } else {
                Self::route_handler(line, role)
            };

            match bucket {
                Some(Bucket::Discrepancy) => result.discrepancy.push(line.clone()),
                Some(Bucket::Shortage) => result.shortage.push(line.clone()),
                Some(Bucket::Sufficient) => result.sufficient.push(line.clone()),
                None => {}
            }
        }

        // sort_by_key 为稳定排序
        result
            .shortage
            .sort_by_key(|line| if line.shortfall() > 0.0 { 0 } else { 1 });

        debug!(
            "分桶完成: discrepancy={}, shortage={}, sufficient={}, excluded={}",
            result.discrepancy.len(),
            result.shortage.len(),
            result.sufficient.len(),
            lines.len() - result.len()
        );

        result
    }

    /// 发起方: 按订单行自身状态分桶
    pub fn route_originator(line: &OrderLine, today: NaiveDate) -> Option<Bucket> {
        if line.has_open_discrepancy() {
            return Some(Bucket::Discrepancy);
        }

        match line.status {
            LineStatus::Resolved => Some(Bucket::Sufficient),
            LineStatus::ShortagePendingDemandOwner | LineStatus::ShortagePendingSupplyOwner => {
                Some(Bucket::Shortage)
            }
            LineStatus::Sufficient => {
                if is_withheld_for_expedite(line, today) {
                    None
                } else if line.shortfall() > 0.0 && !line.is_plan_sufficient() {
                    Some(Bucket::Shortage)
                } else {
                    Some(Bucket::Sufficient)
                }
            }
        }
    }

    /// 处理方: 按已有决策/标志分桶,与该角色无关的订单行不展示
    pub fn route_handler(line: &OrderLine, role: Role) -> Option<Bucket> {
        if line.has_open_discrepancy() {
            return Some(Bucket::Discrepancy);
        }

        let decision = line.demand_decision.as_ref().map(|d| d.kind);

        match role {
            Role::FulfillmentOwner => {
                let awaiting_confirmation = decision
                    .map(|k| k.is_fulfillment_instruction())
                    .unwrap_or(false)
                    && line.fulfillment_confirmation.is_none();

                if awaiting_confirmation {
                    Some(Bucket::Shortage)
                } else if line.expedite_status() != ExpediteStatus::None {
                    Some(Bucket::Sufficient)
                } else {
                    None
                }
            }
            Role::SupplyOwner => {
                let waiting = decision == Some(DemandDecisionKind::WaitForSupply);
                if !waiting {
                    None
                } else if line.status == LineStatus::ShortagePendingSupplyOwner {
                    Some(Bucket::Shortage)
                } else if line.supply_plan.is_some() {
                    Some(Bucket::Sufficient)
                } else {
                    None
                }
            }
            Role::DemandOwner => {
                if line.status == LineStatus::ShortagePendingDemandOwner {
                    Some(Bucket::Shortage)
                } else if line.expedite_status().is_terminal() {
                    Some(Bucket::Sufficient)
                } else {
                    None
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order_line::{DemandDecision, DiscrepancyReport};
    use crate::domain::types::{DiscrepancyCategory, DiscrepancyStatus};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
    }

    fn open_report() -> DiscrepancyReport {
        DiscrepancyReport {
            actual_qty: 3.0,
            requested_qty: 5.0,
            actual_warehouse_qty: 3.0,
            requested_warehouse_qty: 5.0,
            category: DiscrepancyCategory::Inventory,
            status: DiscrepancyStatus::Open,
            department: None,
            reported_by: None,
            reported_at: None,
        }
    }

    #[test]
    fn test_open_report_dominates_every_role() {
        let mut line = OrderLine::new("L-1", "矿泉水", "P-001", 10.0, 0.0, 5.0);
        line.discrepancy_report = Some(open_report());

        for role in [Role::DemandOwner, Role::SupplyOwner, Role::FulfillmentOwner] {
            for originator in [true, false] {
                let c = RoleClassifier::classify(&[line.clone()], role, originator, today());
                assert_eq!(c.bucket_of("L-1"), Some(Bucket::Discrepancy));
            }
        }
    }

    #[test]
    fn test_shortage_sorted_by_shortfall_stable() {
        let mut covered = OrderLine::new("L-0", "纸巾", "P-000", 5.0, 0.0, 5.0);
        covered.status = LineStatus::ShortagePendingDemandOwner;
        let short_a = OrderLine::new("L-1", "矿泉水", "P-001", 10.0, 0.0, 2.0);
        let short_b = OrderLine::new("L-2", "牛奶", "P-002", 10.0, 0.0, 1.0);

        let c = RoleClassifier::classify(
            &[covered, short_a, short_b],
            Role::DemandOwner,
            true,
            today(),
        );
        let ids: Vec<&str> = c.shortage.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["L-1", "L-2", "L-0"]);
    }

    #[test]
    fn test_fulfillment_handler_sees_unconfirmed_ship() {
        let mut line = OrderLine::new("L-1", "矿泉水", "P-001", 10.0, 0.0, 5.0);
        line.demand_decision = Some(DemandDecision::of_kind(DemandDecisionKind::ShipPartial));

        assert_eq!(
            RoleClassifier::route_handler(&line, Role::FulfillmentOwner),
            Some(Bucket::Shortage)
        );
        assert_eq!(RoleClassifier::route_handler(&line, Role::SupplyOwner), None);
    }

    #[test]
    fn test_originator_withholds_expedite_candidate() {
        let mut line = OrderLine::new("L-1", "矿泉水", "P-001", 10.0, 0.0, 10.0);
        line.due_date = NaiveDate::from_ymd_opt(2026, 3, 9);

        let c = RoleClassifier::classify(&[line], Role::DemandOwner, true, today());
        assert!(c.is_empty());
    }
}
