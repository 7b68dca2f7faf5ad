use super::core::{DecisionLogRepository, TS_FORMAT};
use crate::domain::decision_log::DecisionLogEntry;
use crate::repository::error::RepositoryResult;
use chrono::NaiveDateTime;
use rusqlite::{params, Result as SqliteResult, Row};

const SELECT_COLUMNS: &str = r#"
    SELECT log_id, context_id, line_id, rule_id, actor_role, actor,
           status_before, status_after, logged_at, params_json,
           notification_tag, notification_delivered, note
    FROM decision_log
"#;

impl DecisionLogRepository {
    // ==========================================
    // 查询操作
    // ==========================================

    /// 按 log_id 查询
    pub fn find_by_id(&self, log_id: &str) -> RepositoryResult<Option<DecisionLogEntry>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE log_id = ?1", SELECT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;

        match stmt.query_row(params![log_id], map_row) {
            Ok(entry) => Ok(Some(entry)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询上下文内的全部日志 (按时间正序,同一时刻按插入顺序)
    pub fn find_by_context(&self, context_id: &str) -> RepositoryResult<Vec<DecisionLogEntry>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "{} WHERE context_id = ?1 ORDER BY logged_at ASC, rowid ASC",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;

        let entries = stmt
            .query_map(params![context_id], map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(entries)
    }

    /// 查询单个订单行的日志
    pub fn find_by_line(
        &self,
        context_id: &str,
        line_id: &str,
    ) -> RepositoryResult<Vec<DecisionLogEntry>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "{} WHERE context_id = ?1 AND line_id = ?2 ORDER BY logged_at ASC, rowid ASC",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;

        let entries = stmt
            .query_map(params![context_id, line_id], map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(entries)
    }

    /// 统计上下文内的日志数
    pub fn count_by_context(&self, context_id: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM decision_log WHERE context_id = ?1",
            params![context_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// 统计通知未送达的日志数 (严格策略下才会出现)
    pub fn count_undelivered(&self, context_id: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM decision_log WHERE context_id = ?1 AND notification_delivered = 0",
            params![context_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

// ==========================================
// 辅助方法
// ==========================================

/// 将数据库行映射为 DecisionLogEntry
fn map_row(row: &Row) -> SqliteResult<DecisionLogEntry> {
    let logged_at_str: String = row.get(8)?;
    let logged_at = NaiveDateTime::parse_from_str(&logged_at_str, TS_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let params_json_str: Option<String> = row.get(9)?;
    let params_json = params_json_str.and_then(|s| serde_json::from_str(&s).ok());

    Ok(DecisionLogEntry {
        log_id: row.get(0)?,
        context_id: row.get(1)?,
        line_id: row.get(2)?,
        rule_id: row.get(3)?,
        actor_role: row.get(4)?,
        actor: row.get(5)?,
        status_before: row.get(6)?,
        status_after: row.get(7)?,
        logged_at,
        params_json,
        notification_tag: row.get(10)?,
        notification_delivered: row.get(11)?,
        note: row.get(12)?,
    })
}
