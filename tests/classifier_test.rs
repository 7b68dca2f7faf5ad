// ==========================================
// 角色分桶集成测试
// ==========================================
// 覆盖: 三个桶互不相交且都是输入子集, 差异报告优先,
//       加急候选暂扣, 处理方按角色过滤
// ==========================================


use shortage_workflow::domain::{
    DemandDecisionKind, ExpediteRequest, ExpediteStatus, LineStatus, OrderLine, Role, SupplyPlan,
    SupplyPlanStatus,
};
use shortage_workflow::engine::{expedite_candidates, Bucket, RoleClassifier};
use std::collections::HashSet;
use test_helpers::*;

fn expedite(status: ExpediteStatus) -> ExpediteRequest {
    ExpediteRequest {
        status,
        target_date: None,
        requested_by: None,
        requested_at: None,
        answered_by: None,
        answered_at: None,
        reason: None,
    }
}

/// 覆盖各类状态与决策组合的工作集
fn mixed_working_set() -> Vec<OrderLine> {
    let mut resolved = sufficient_line("RESOLVED");
    resolved.status = LineStatus::Resolved;

    let mut reported = shortage_line("REPORTED");
    reported.discrepancy_report = Some(open_report(3.0, 5.0));

    let mut waiting = with_decision(shortage_line("WAITING"), DemandDecisionKind::WaitForSupply);
    waiting.status = LineStatus::ShortagePendingSupplyOwner;

    let mut planned = with_decision(shortage_line("PLANNED"), DemandDecisionKind::WaitForSupply);
    planned.supply_plan = Some(SupplyPlan {
        status: SupplyPlanStatus::Confirmed,
        eta: Some(days_from_today(2)),
        supplier: None,
        planned_by: None,
        updated_at: None,
    });

    let mut shipped = with_decision(shortage_line("SHIPPED"), DemandDecisionKind::ShipPartial);
    shipped.status = LineStatus::Resolved;

    let mut pending_expedite = expeditable_line("EXP-PENDING");
    pending_expedite.expedite_request = Some(expedite(ExpediteStatus::Pending));

    let mut answered_expedite = expeditable_line("EXP-DONE");
    answered_expedite.expedite_request = Some(expedite(ExpediteStatus::Accepted));

    vec![
        shortage_line("SHORT"),
        sufficient_line("OK"),
        resolved,
        reported,
        waiting,
        planned,
        shipped,
        expeditable_line("EXP-NEW"),
        pending_expedite,
        answered_expedite,
    ]
}

#[test]
fn test_buckets_are_disjoint_subsets_for_every_role() {
    let lines = mixed_working_set();
    let input_ids: HashSet<&str> = lines.iter().map(|l| l.id.as_str()).collect();

    for role in [Role::DemandOwner, Role::SupplyOwner, Role::FulfillmentOwner] {
        for is_originator in [true, false] {
            let c = RoleClassifier::classify(&lines, role, is_originator, today());

            let mut seen = HashSet::new();
            for l in c.discrepancy.iter().chain(&c.shortage).chain(&c.sufficient) {
                assert!(input_ids.contains(l.id.as_str()));
                assert!(
                    seen.insert(l.id.clone()),
                    "{} 出现在多个桶中 (role={}, originator={})",
                    l.id,
                    role,
                    is_originator
                );
            }
            assert!(c.len() <= lines.len());
        }
    }
}

#[test]
fn test_open_report_dominates_every_view() {
    let lines = mixed_working_set();
    for role in [Role::DemandOwner, Role::SupplyOwner, Role::FulfillmentOwner] {
        for is_originator in [true, false] {
            let c = RoleClassifier::classify(&lines, role, is_originator, today());
            assert_eq!(c.bucket_of("REPORTED"), Some(Bucket::Discrepancy));
            assert_eq!(c.discrepancy.len(), 1);
        }
    }
}

#[test]
fn test_originator_view() {
    let lines = mixed_working_set();
    let c = RoleClassifier::classify(&lines, Role::DemandOwner, true, today());

    assert_eq!(c.bucket_of("SHORT"), Some(Bucket::Shortage));
    assert_eq!(c.bucket_of("WAITING"), Some(Bucket::Shortage));
    assert_eq!(c.bucket_of("OK"), Some(Bucket::Sufficient));
    assert_eq!(c.bucket_of("RESOLVED"), Some(Bucket::Sufficient));
    assert_eq!(c.bucket_of("EXP-DONE"), Some(Bucket::Sufficient));

    // 加急子流程中的订单行被暂扣
    assert_eq!(c.bucket_of("EXP-NEW"), None);
    assert_eq!(c.bucket_of("EXP-PENDING"), None);

    let candidates: Vec<String> = expedite_candidates(&lines, today())
        .into_iter()
        .map(|l| l.id)
        .collect();
    assert!(candidates.contains(&"EXP-NEW".to_string()));
    assert!(candidates.contains(&"EXP-PENDING".to_string()));
    assert!(!candidates.contains(&"SHORT".to_string()));
}

#[test]
fn test_originator_shortage_bucket_lists_real_shortfalls_first() {
    let mut covered = shortage_line("COVERED");
    covered.quantity_available = 10.0;
    covered.status = LineStatus::ShortagePendingDemandOwner;

    let lines = vec![covered, shortage_line("SHORT")];
    let c = RoleClassifier::classify(&lines, Role::DemandOwner, true, today());

    let ids: Vec<&str> = c.shortage.iter().map(|l| l.id.as_str()).collect();
    assert_eq!(ids, vec!["SHORT", "COVERED"]);
}

#[test]
fn test_supply_owner_handler_view() {
    let lines = mixed_working_set();
    let c = RoleClassifier::classify(&lines, Role::SupplyOwner, false, today());

    assert_eq!(c.bucket_of("WAITING"), Some(Bucket::Shortage));
    assert_eq!(c.bucket_of("PLANNED"), Some(Bucket::Sufficient));
    assert_eq!(c.bucket_of("SHORT"), None);
    assert_eq!(c.bucket_of("SHIPPED"), None);
}

#[test]
fn test_fulfillment_owner_handler_view() {
    let lines = mixed_working_set();
    let c = RoleClassifier::classify(&lines, Role::FulfillmentOwner, false, today());

    assert_eq!(c.bucket_of("SHIPPED"), Some(Bucket::Shortage));
    assert_eq!(c.bucket_of("EXP-PENDING"), Some(Bucket::Sufficient));
    assert_eq!(c.bucket_of("WAITING"), None);
    assert_eq!(c.bucket_of("OK"), None);
}

#[test]
fn test_demand_owner_handler_view() {
    let lines = mixed_working_set();
    let c = RoleClassifier::classify(&lines, Role::DemandOwner, false, today());

    assert_eq!(c.bucket_of("SHORT"), Some(Bucket::Shortage));
    assert_eq!(c.bucket_of("EXP-DONE"), Some(Bucket::Sufficient));
    assert_eq!(c.bucket_of("WAITING"), None);
}
