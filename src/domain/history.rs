// ==========================================
// 订单行缺货处理 - 历史快照
// ==========================================
// 写入纪律: 读取 → 合并 → 整体覆盖,不做增量补丁
// 键: 订单行ID 规范化 (去花括号、去空白、小写)
// ==========================================

use crate::domain::order_line::{
    DemandDecision, DiscrepancyReport, ExpediteRequest, FulfillmentConfirmation, OrderLine,
    SupplyPlan,
};
use crate::domain::types::{DemandDecisionKind, LineStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};

/// 规范化订单行ID
///
/// `{ABC-1}`、` abc-1 `、`ABC-1` 都视为同一个ID
pub fn normalize_line_id(raw: &str) -> String {
    raw.chars()
        .filter(|c| *c != '{' && *c != '}')
        .collect::<String>()
        .trim()
        .to_lowercase()
}

// ==========================================
// HistoryEntry - 单个订单行的持久化投影
// ==========================================
// 只保存决策槽位与标志,数量一律以实时数据为准
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<LineStatus>,
    #[serde(
        default,
        alias = "saleDecision",
        deserialize_with = "deserialize_demand_decision",
        skip_serializing_if = "Option::is_none"
    )]
    pub demand_decision: Option<DemandDecision>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supply_plan: Option<SupplyPlan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fulfillment_confirmation: Option<FulfillmentConfirmation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discrepancy_report: Option<DiscrepancyReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expedite_request: Option<ExpediteRequest>,
}

impl HistoryEntry {
    /// 从订单行投影
    pub fn from_line(line: &OrderLine) -> Self {
        Self {
            status: Some(line.status),
            demand_decision: line.demand_decision.clone(),
            supply_plan: line.supply_plan.clone(),
            fulfillment_confirmation: line.fulfillment_confirmation.clone(),
            discrepancy_report: line.discrepancy_report.clone(),
            expedite_request: line.expedite_request.clone(),
        }
    }
}

/// 兼容两种历史格式: 完整决策对象,或仅决策类型字符串
fn deserialize_demand_decision<'de, D>(deserializer: D) -> Result<Option<DemandDecision>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Kind(DemandDecisionKind),
        Full(DemandDecision),
    }

    let repr: Option<Repr> = Option::deserialize(deserializer)?;
    Ok(repr.map(|r| match r {
        Repr::Kind(kind) => DemandDecision::of_kind(kind),
        Repr::Full(decision) => decision,
    }))
}

// ==========================================
// HistoryContext - 快照所属的订单/上下文
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryContext {
    pub context_id: String,
    #[serde(default)]
    pub order_no: Option<String>,
}

impl HistoryContext {
    pub fn new(context_id: &str) -> Self {
        Self {
            context_id: context_id.to_string(),
            order_no: None,
        }
    }
}

// ==========================================
// HistorySnapshot - 整份历史文档
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySnapshot {
    pub context: HistoryContext,
    #[serde(default)]
    pub entries: BTreeMap<String, HistoryEntry>,
    pub saved_at: DateTime<Utc>,
}

impl HistorySnapshot {
    /// 空快照
    pub fn empty(context: HistoryContext, now: DateTime<Utc>) -> Self {
        Self {
            context,
            entries: BTreeMap::new(),
            saved_at: now,
        }
    }

    /// 从工作集构建整份快照
    pub fn capture(context: HistoryContext, lines: &[OrderLine], now: DateTime<Utc>) -> Self {
        let entries = lines
            .iter()
            .map(|line| (normalize_line_id(&line.id), HistoryEntry::from_line(line)))
            .collect();

        Self {
            context,
            entries,
            saved_at: now,
        }
    }

    /// 读取-合并: 用更新后的订单行替换其条目,返回新的整份快照
    ///
    /// 规范化后与该订单行同ID的旧键 (如 `{ABC-1}`) 一并移除,每行只留一个条目
    pub fn with_line(&self, line: &OrderLine, now: DateTime<Utc>) -> Self {
        let key = normalize_line_id(&line.id);
        let mut entries = self.entries.clone();
        entries.retain(|k, _| normalize_line_id(k) != key);
        entries.insert(key, HistoryEntry::from_line(line));

        Self {
            context: self.context.clone(),
            entries,
            saved_at: now,
        }
    }

    /// 按规范化ID查找条目 (快照键本身也可能未规范化)
    ///
    /// 多个键规范化后相同时,已规范化的键优先,其次取键序第一个
    pub fn entry_for(&self, line_id: &str) -> Option<&HistoryEntry> {
        let wanted = normalize_line_id(line_id);
        self.entries.get(&wanted).or_else(|| {
            self.entries
                .iter()
                .find(|(key, _)| normalize_line_id(key) == wanted)
                .map(|(_, entry)| entry)
        })
    }

    /// 规范化ID → 条目 (同 `entry_for` 的优先级)
    pub fn normalized_entries(&self) -> HashMap<String, &HistoryEntry> {
        let mut lookup: HashMap<String, &HistoryEntry> = HashMap::new();
        for (key, entry) in &self.entries {
            let normalized = normalize_line_id(key);
            if *key == normalized {
                lookup.insert(normalized, entry);
            } else {
                lookup.entry(normalized).or_insert(entry);
            }
        }
        lookup
    }
}
