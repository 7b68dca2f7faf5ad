// ==========================================
// 订单行缺货处理 - 订单行数据源
// ==========================================
// 职责: 抽象外部订单后端 fetchEntitiesForContext
// 说明: 返回的数量与交付序列是实时数据,决策槽位由历史合并补齐
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::order_line::OrderLine;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// 订单行数据源
#[async_trait]
pub trait OrderLineSource: Send + Sync {
    /// 获取上下文下的全部订单行
    async fn fetch_lines(&self, context_id: &str) -> ApiResult<Vec<OrderLine>>;
}

// ==========================================
// InMemoryOrderLineSource - 内存数据源
// ==========================================
#[derive(Debug, Default)]
pub struct InMemoryOrderLineSource {
    contexts: RwLock<HashMap<String, Vec<OrderLine>>>,
}

impl InMemoryOrderLineSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置 (覆盖) 上下文的订单行
    pub fn put_lines(&self, context_id: &str, lines: Vec<OrderLine>) -> ApiResult<()> {
        let mut guard = self
            .contexts
            .write()
            .map_err(|e| ApiError::SourceError(format!("数据源锁获取失败: {}", e)))?;
        guard.insert(context_id.to_string(), lines);
        Ok(())
    }
}

#[async_trait]
impl OrderLineSource for InMemoryOrderLineSource {
    async fn fetch_lines(&self, context_id: &str) -> ApiResult<Vec<OrderLine>> {
        let guard = self
            .contexts
            .read()
            .map_err(|e| ApiError::SourceError(format!("数据源锁获取失败: {}", e)))?;
        Ok(guard.get(context_id).cloned().unwrap_or_default())
    }
}
