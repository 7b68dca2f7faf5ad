use crate::domain::decision_log::DecisionLogEntry;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Transaction};
use std::sync::{Arc, Mutex};

pub(super) const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ==========================================
// DecisionLogRepository - 决策日志仓储
// ==========================================
// 红线: Repository 不做业务逻辑,只做数据映射
pub struct DecisionLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl DecisionLogRepository {
    /// 创建新的决策日志仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    pub(super) fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作 (只追加)
    // ==========================================

    /// 追加一条决策日志
    ///
    /// # 返回
    /// - `Ok(log_id)`: 成功插入
    pub fn insert(&self, entry: &DecisionLogEntry) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        insert_with(&conn, entry)?;
        Ok(entry.log_id.clone())
    }

    /// 批量追加 (单事务)
    pub fn batch_insert(&self, entries: &[DecisionLogEntry]) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx: Transaction<'_> = conn.transaction()?;

        for entry in entries {
            insert_with(&tx, entry)?;
        }

        tx.commit()?;
        Ok(entries.len())
    }
}

fn insert_with(conn: &Connection, entry: &DecisionLogEntry) -> RepositoryResult<()> {
    conn.execute(
        r#"
        INSERT INTO decision_log (
            log_id, context_id, line_id, rule_id, actor_role, actor,
            status_before, status_after, logged_at, params_json,
            notification_tag, notification_delivered, note
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
        "#,
        params![
            entry.log_id,
            entry.context_id,
            entry.line_id,
            entry.rule_id,
            entry.actor_role,
            entry.actor,
            entry.status_before,
            entry.status_after,
            entry.logged_at.format(TS_FORMAT).to_string(),
            entry.params_json.as_ref().map(|v| v.to_string()),
            entry.notification_tag,
            entry.notification_delivered,
            entry.note,
        ],
    )?;
    Ok(())
}
