// ==========================================
// 订单行缺货处理 - 规则目录条目
// ==========================================
// 红线: 规则是只读配置,运行期不可修改
// 红线: 新业务场景只能新增规则条目,不能在执行器里加分支
// ==========================================

use crate::domain::types::{CloseOut, NextStatus, NotificationTag, Role, RuleGroup, TriggerAction};
use serde::{Deserialize, Serialize};

/// 规则目录条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub id: String,
    pub group: RuleGroup,
    pub actor: Role,                     // 发起动作的角色
    pub input_condition: String,         // 输入条件 (说明文字)
    pub action: TriggerAction,           // 触发动作
    pub notification: NotificationTag,   // 发出的通知类型
    pub next_status: NextStatus,         // 转换后状态
    #[serde(default = "default_close_out")]
    pub close_out: CloseOut,             // 发货是否关闭订单行
    pub output: String,                  // 输出说明
    #[serde(default)]
    pub rationale: String,               // 业务依据 (文档用途)
}

fn default_close_out() -> CloseOut {
    CloseOut::NotApplicable
}

impl Rule {
    /// 规则是否适用于该交付阶段
    ///
    /// 例外组规则与阶段无关
    pub fn applies_to_phase(&self, phase: u32) -> bool {
        match self.group {
            RuleGroup::Exception => true,
            group => group == RuleGroup::for_phase(phase),
        }
    }
}
