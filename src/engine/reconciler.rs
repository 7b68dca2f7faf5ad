// ==========================================
// 订单行缺货处理 - 历史合并
// ==========================================
// 职责: 把持久化的决策槽位叠加到实时订单行上
// 红线: 数量一律以实时数据为准,历史只贡献状态与决策槽位
// 红线: 各槽位独立合并,历史中缺失的槽位不清空实时值
// 红线: 幂等 - 同一快照合并两次结果不变
// ==========================================

use crate::domain::history::{normalize_line_id, HistoryEntry, HistorySnapshot};
use crate::domain::order_line::OrderLine;
use std::collections::HashSet;
use tracing::{debug, instrument};

pub struct HistoryReconciler;

impl HistoryReconciler {
    /// 合并历史快照
    ///
    /// # 参数
    /// - fresh: 实时订单行 (以此顺序输出)
    /// - snapshot: 持久化快照 (None 时原样返回)
    ///
    /// # 返回
    /// 合并后的订单行; 快照中无对应实时订单行的条目被丢弃
    #[instrument(skip_all, fields(fresh = fresh.len(), has_snapshot = snapshot.is_some()))]
    pub fn reconcile(fresh: Vec<OrderLine>, snapshot: Option<&HistorySnapshot>) -> Vec<OrderLine> {
        let snapshot = match snapshot {
            Some(s) => s,
            None => return fresh,
        };

        // 同一订单行存在多个原始键时,已规范化的键优先
        let lookup = snapshot.normalized_entries();

        let mut matched = HashSet::new();
        let merged: Vec<OrderLine> = fresh
            .into_iter()
            .map(|line| {
                let key = normalize_line_id(&line.id);
                match lookup.get(&key) {
                    Some(entry) => {
                        matched.insert(key);
                        Self::overlay(line, entry)
                    }
                    None => line,
                }
            })
            .collect();

        for key in lookup.keys().filter(|k| !matched.contains(*k)) {
            debug!(
                "历史条目无对应订单行,已丢弃: context_id={}, line_id={}",
                snapshot.context.context_id, key
            );
        }

        merged
    }

    /// 单行叠加
    pub fn overlay(mut line: OrderLine, entry: &HistoryEntry) -> OrderLine {
        if let Some(status) = entry.status {
            line.status = status;
        }
        if let Some(decision) = &entry.demand_decision {
            line.demand_decision = Some(decision.clone());
        }
        if let Some(plan) = &entry.supply_plan {
            line.supply_plan = Some(plan.clone());
        }
        if let Some(confirmation) = &entry.fulfillment_confirmation {
            line.fulfillment_confirmation = Some(confirmation.clone());
        }
        if let Some(report) = &entry.discrepancy_report {
            line.discrepancy_report = Some(report.clone());
        }
        if let Some(expedite) = &entry.expedite_request {
            line.expedite_request = Some(expedite.clone());
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::history::HistoryContext;
    use crate::domain::order_line::DemandDecision;
    use crate::domain::types::{DemandDecisionKind, LineStatus};
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_overlay_keeps_fresh_quantities() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
        let mut stored = OrderLine::new("{ABC-1}", "矿泉水", "P-001", 10.0, 0.0, 4.0);
        stored.status = LineStatus::ShortagePendingSupplyOwner;
        stored.demand_decision = Some(DemandDecision::of_kind(DemandDecisionKind::WaitForSupply));
        let snapshot = HistorySnapshot::capture(HistoryContext::new("SO-1"), &[stored], now);

        let fresh = OrderLine::new("abc-1", "矿泉水", "P-001", 10.0, 0.0, 7.0);
        let merged = HistoryReconciler::reconcile(vec![fresh], Some(&snapshot));

        assert_eq!(merged[0].quantity_available, 7.0);
        assert_eq!(merged[0].status, LineStatus::ShortagePendingSupplyOwner);
        assert_eq!(
            merged[0].demand_decision.as_ref().map(|d| d.kind),
            Some(DemandDecisionKind::WaitForSupply)
        );
    }

    #[test]
    fn test_no_snapshot_is_identity() {
        let fresh = vec![OrderLine::new("L-1", "矿泉水", "P-001", 10.0, 0.0, 4.0)];
        let merged = HistoryReconciler::reconcile(fresh.clone(), None);
        assert_eq!(merged, fresh);
    }
}
