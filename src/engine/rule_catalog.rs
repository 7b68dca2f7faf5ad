// ==========================================
// 订单行缺货处理 - 规则目录
// ==========================================
// 职责: 声明式的状态转换规则表,只提供查找,不含逻辑
// 红线: 规则按 id 相等比较; 运行期只读
// 边界: 目录可序列化为 JSON (fixtures/rule_catalog.json),可独立于执行器检查
// ==========================================

use crate::domain::rule::Rule;
use crate::domain::types::{
    CloseOut, NextStatus, NotificationTag, Role, RuleGroup, TriggerAction,
};
use crate::engine::error::{EngineError, EngineResult};
use std::sync::OnceLock;

// ==========================================
// RuleCatalog - 规则目录
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct RuleCatalog {
    rules: Vec<Rule>,
}

impl RuleCatalog {
    /// 内置规则目录
    pub fn builtin() -> Self {
        Self {
            rules: builtin_rules(),
        }
    }

    /// 从 JSON 加载规则目录 (版本化的外部目录)
    ///
    /// # 错误
    /// - `CatalogFormat`: JSON 无法解析,或存在重复的规则ID
    pub fn from_json(raw: &str) -> EngineResult<Self> {
        let rules: Vec<Rule> = serde_json::from_str(raw)?;

        let mut seen = std::collections::HashSet::new();
        for rule in &rules {
            if !seen.insert(rule.id.as_str()) {
                return Err(EngineError::CatalogFormat(format!(
                    "重复的规则ID: {}",
                    rule.id
                )));
            }
        }

        Ok(Self { rules })
    }

    /// 序列化为 JSON (格式化输出)
    pub fn to_json(&self) -> EngineResult<String> {
        Ok(serde_json::to_string_pretty(&self.rules)?)
    }

    pub fn list_rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn find_rule(&self, id: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.id == id)
    }

    /// 查找规则,不存在则返回 `RuleNotFound`
    pub fn require(&self, id: &str) -> EngineResult<&Rule> {
        self.find_rule(id).ok_or_else(|| EngineError::RuleNotFound {
            rule_id: id.to_string(),
        })
    }

    /// 按动作与交付阶段选择规则
    ///
    /// 阶段组优先,找不到再回退到例外组
    pub fn select(&self, action: TriggerAction, phase: u32) -> Option<&Rule> {
        let group = RuleGroup::for_phase(phase);
        self.rules
            .iter()
            .find(|r| r.action == action && r.group == group)
            .or_else(|| {
                self.rules
                    .iter()
                    .find(|r| r.action == action && r.group == RuleGroup::Exception)
            })
    }

    /// 某角色可发起的规则
    pub fn rules_for_actor(&self, actor: Role) -> Vec<&Rule> {
        self.rules.iter().filter(|r| r.actor == actor).collect()
    }
}

impl Default for RuleCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

// ==========================================
// 全局内置目录访问
// ==========================================

fn builtin_catalog() -> &'static RuleCatalog {
    static CATALOG: OnceLock<RuleCatalog> = OnceLock::new();
    CATALOG.get_or_init(RuleCatalog::builtin)
}

/// 列出内置目录中的全部规则
pub fn list_rules() -> &'static [Rule] {
    builtin_catalog().list_rules()
}

/// 在内置目录中查找规则
pub fn find_rule(id: &str) -> EngineResult<&'static Rule> {
    builtin_catalog().require(id)
}

// ==========================================
// 内置规则表
// ==========================================

#[allow(clippy::too_many_arguments)]
fn rule(
    id: &str,
    group: RuleGroup,
    actor: Role,
    input_condition: &str,
    action: TriggerAction,
    notification: NotificationTag,
    next_status: NextStatus,
    close_out: CloseOut,
    output: &str,
    rationale: &str,
) -> Rule {
    Rule {
        id: id.to_string(),
        group,
        actor,
        input_condition: input_condition.to_string(),
        action,
        notification,
        next_status,
        close_out,
        output: output.to_string(),
        rationale: rationale.to_string(),
    }
}

fn builtin_rules() -> Vec<Rule> {
    use CloseOut::{Always, NotApplicable, Optional};
    use NextStatus::{KeepCurrent, Resolved, ShortagePendingDemandOwner, ShortagePendingSupplyOwner};
    use Role::{DemandOwner, FulfillmentOwner, SupplyOwner};
    use RuleGroup::{Exception, Phase1, PhaseN};

    vec![
        // ===== 首次交付 (phase = 1) =====
        rule(
            "P1-SHIP",
            Phase1,
            DemandOwner,
            "首次交付缺货,销售决定按可用量发货",
            TriggerAction::Ship,
            NotificationTag::DemandToFulfillment,
            Resolved,
            Optional,
            "记录发货决策,通知仓库按数量发货",
            "首次交付允许部分发货后保留订单行,剩余数量后续补交",
        ),
        rule(
            "P1-WAIT",
            Phase1,
            DemandOwner,
            "首次交付缺货,销售决定等待补货",
            TriggerAction::Wait,
            NotificationTag::DemandToSupply,
            ShortagePendingSupplyOwner,
            NotApplicable,
            "清空旧供应计划,通知采购给出到货日期",
            "等待决策把处理权交给采购",
        ),
        rule(
            "P1-CANCEL",
            Phase1,
            DemandOwner,
            "首次交付缺货,销售决定取消缺货数量",
            TriggerAction::Cancel,
            NotificationTag::CancelClose,
            Resolved,
            NotApplicable,
            "记录取消决策,通知仓库关闭",
            "取消数量默认等于全部净需求",
        ),
        rule(
            "P1-SUPPLY-CONFIRM",
            Phase1,
            SupplyOwner,
            "订单行等待采购计划",
            TriggerAction::SupplyConfirm,
            NotificationTag::SupplyEta,
            ShortagePendingDemandOwner,
            NotApplicable,
            "记录供应计划,通知销售到货日期",
            "拿到到货日期后由销售重新决策",
        ),
        rule(
            "P1-REPORT-DISCREPANCY",
            Phase1,
            FulfillmentOwner,
            "仓库发现实物数量与系统数量不符",
            TriggerAction::ReportDiscrepancy,
            NotificationTag::DiscrepancyReport,
            KeepCurrent,
            NotApplicable,
            "记录双单位差异报告,通知销售",
            "差异报告等待销售处理,不改变生命周期状态",
        ),
        rule(
            "P1-FULFILL-CONFIRM",
            Phase1,
            FulfillmentOwner,
            "仓库收到首次交付发货指令",
            TriggerAction::FulfillmentConfirm,
            NotificationTag::FulfillmentConfirmed,
            KeepCurrent,
            NotApplicable,
            "记录仓库确认,通知销售",
            "确认只是执行回执,不改变状态",
        ),
        rule(
            "P1-FULFILL-REJECT",
            Phase1,
            FulfillmentOwner,
            "仓库无法执行首次交付发货指令",
            TriggerAction::FulfillmentReject,
            NotificationTag::FulfillmentRejected,
            ShortagePendingDemandOwner,
            NotApplicable,
            "记录拒绝原因,退回销售重新决策",
            "仓库拒绝后必须由销售重新选择处理方式",
        ),
        // ===== 后续交付 (phase > 1) =====
        rule(
            "PN-SHIP",
            PhaseN,
            DemandOwner,
            "后续交付缺货,销售决定按可用量发货",
            TriggerAction::Ship,
            NotificationTag::DemandToFulfillment,
            Resolved,
            Always,
            "记录发货决策并关闭订单行,通知仓库",
            "后续交付不再保留余量,发货即关闭",
        ),
        rule(
            "PN-WAIT",
            PhaseN,
            DemandOwner,
            "后续交付缺货,销售决定继续等待补货",
            TriggerAction::Wait,
            NotificationTag::DemandToSupply,
            ShortagePendingSupplyOwner,
            NotApplicable,
            "清空旧供应计划,再次通知采购",
            "再次等待需要采购重新给出计划",
        ),
        rule(
            "PN-CANCEL",
            PhaseN,
            DemandOwner,
            "后续交付缺货,销售决定取消剩余数量",
            TriggerAction::Cancel,
            NotificationTag::CancelClose,
            Resolved,
            NotApplicable,
            "记录取消决策,关闭订单行",
            "取消剩余净需求",
        ),
        rule(
            "PN-SUPPLY-CONFIRM",
            PhaseN,
            SupplyOwner,
            "后续交付等待采购计划",
            TriggerAction::SupplyConfirm,
            NotificationTag::SupplyEta,
            ShortagePendingDemandOwner,
            NotApplicable,
            "记录供应计划,通知销售到货日期",
            "拿到到货日期后由销售重新决策",
        ),
        rule(
            "PN-REPORT-DISCREPANCY",
            PhaseN,
            FulfillmentOwner,
            "后续交付中仓库发现数量差异",
            TriggerAction::ReportDiscrepancy,
            NotificationTag::DiscrepancyReport,
            KeepCurrent,
            NotApplicable,
            "记录双单位差异报告,通知销售",
            "差异报告等待销售处理,不改变生命周期状态",
        ),
        rule(
            "PN-FULFILL-CONFIRM",
            PhaseN,
            FulfillmentOwner,
            "仓库收到后续交付发货指令",
            TriggerAction::FulfillmentConfirm,
            NotificationTag::FulfillmentConfirmed,
            KeepCurrent,
            NotApplicable,
            "记录仓库确认,通知销售",
            "确认只是执行回执,不改变状态",
        ),
        rule(
            "PN-FULFILL-REJECT",
            PhaseN,
            FulfillmentOwner,
            "仓库无法执行后续交付发货指令",
            TriggerAction::FulfillmentReject,
            NotificationTag::FulfillmentRejected,
            ShortagePendingDemandOwner,
            NotApplicable,
            "记录拒绝原因,退回销售重新决策",
            "仓库拒绝后必须由销售重新选择处理方式",
        ),
        // ===== 例外流程 =====
        rule(
            "EX-REJECT-DISCREPANCY",
            Exception,
            DemandOwner,
            "销售不认可仓库差异报告",
            TriggerAction::RejectDiscrepancy,
            NotificationTag::DiscrepancyRejected,
            ShortagePendingDemandOwner,
            NotApplicable,
            "差异报告标记为驳回,通知仓库",
            "驳回后订单行回到销售待决策",
        ),
        rule(
            "EX-PICKING-CONFIRM",
            Exception,
            FulfillmentOwner,
            "库存充足的订单行进入拣货",
            TriggerAction::FulfillmentConfirm,
            NotificationTag::PickingNotice,
            KeepCurrent,
            NotApplicable,
            "记录仓库确认,发出拣货通知",
            "充足订单行无需决策,只需拣货回执",
        ),
        rule(
            "EX-EXPEDITE-REQUEST",
            Exception,
            DemandOwner,
            "未来交付且理论库存充足,销售请求提前交付",
            TriggerAction::ExpediteRequest,
            NotificationTag::ExpediteRequested,
            KeepCurrent,
            NotApplicable,
            "加急请求进入待处理,通知仓库",
            "加急只改变交付时间,不改变缺货状态",
        ),
        rule(
            "EX-EXPEDITE-ACCEPT",
            Exception,
            FulfillmentOwner,
            "仓库同意加急请求",
            TriggerAction::ExpediteAccept,
            NotificationTag::ExpediteAnswered,
            KeepCurrent,
            NotApplicable,
            "加急请求标记为接受,通知销售",
            "终态,不允许再转换",
        ),
        rule(
            "EX-EXPEDITE-REJECT",
            Exception,
            FulfillmentOwner,
            "仓库拒绝加急请求",
            TriggerAction::ExpediteReject,
            NotificationTag::ExpediteAnswered,
            KeepCurrent,
            NotApplicable,
            "加急请求标记为拒绝,通知销售",
            "终态,不允许再转换",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_ids_unique() {
        let catalog = RuleCatalog::builtin();
        let json = catalog.to_json().unwrap();
        assert!(RuleCatalog::from_json(&json).is_ok());
    }

    #[test]
    fn test_find_rule_not_found() {
        let err = find_rule("ZZZ").unwrap_err();
        assert!(matches!(err, EngineError::RuleNotFound { rule_id } if rule_id == "ZZZ"));
    }

    #[test]
    fn test_select_by_phase() {
        let catalog = RuleCatalog::builtin();
        assert_eq!(catalog.select(TriggerAction::Ship, 1).unwrap().id, "P1-SHIP");
        assert_eq!(catalog.select(TriggerAction::Ship, 3).unwrap().id, "PN-SHIP");
        assert_eq!(
            catalog.select(TriggerAction::ExpediteRequest, 1).unwrap().id,
            "EX-EXPEDITE-REQUEST"
        );
    }

    #[test]
    fn test_phase_groups_share_trigger_actions() {
        let catalog = RuleCatalog::builtin();
        let actions = |group: RuleGroup| {
            let mut v: Vec<_> = catalog
                .list_rules()
                .iter()
                .filter(|r| r.group == group)
                .map(|r| r.action.as_str())
                .collect();
            v.sort();
            v
        };
        assert_eq!(actions(RuleGroup::Phase1), actions(RuleGroup::PhaseN));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let catalog = RuleCatalog::builtin();
        let mut rules = catalog.list_rules().to_vec();
        rules.push(rules[0].clone());
        let json = serde_json::to_string(&rules).unwrap();
        assert!(matches!(
            RuleCatalog::from_json(&json),
            Err(EngineError::CatalogFormat(_))
        ));
    }
}
