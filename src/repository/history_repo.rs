// ==========================================
// 订单行缺货处理 - 历史快照仓储
// ==========================================
// 对齐: history_snapshot 表 (每个上下文一份 JSON 文档)
// 写入纪律: 整份覆盖 (upsert),不做字段级补丁
// 说明: 后写覆盖先写; 并发冲突靠 decision_log 事后发现
// ==========================================

use crate::domain::history::HistorySnapshot;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};
use tracing::debug;

pub struct SqliteHistoryRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteHistoryRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 读取上下文的历史快照
    ///
    /// # 返回
    /// - `Ok(None)`: 该上下文尚未保存过
    pub fn fetch_history(&self, context_id: &str) -> RepositoryResult<Option<HistorySnapshot>> {
        let conn = self.get_conn()?;

        let raw: Option<String> = conn
            .query_row(
                "SELECT snapshot_json FROM history_snapshot WHERE context_id = ?1",
                params![context_id],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// 整份保存历史快照 (首次插入,之后覆盖)
    ///
    /// # 返回
    /// - `Ok(true)`: 已写入
    pub fn persist_history(
        &self,
        context_id: &str,
        snapshot: &HistorySnapshot,
        note: Option<&str>,
    ) -> RepositoryResult<bool> {
        let json = serde_json::to_string(snapshot)?;
        let conn = self.get_conn()?;

        let rows = conn.execute(
            r#"
            INSERT INTO history_snapshot (context_id, snapshot_json, note, saved_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(context_id) DO UPDATE SET
                snapshot_json = excluded.snapshot_json,
                note = excluded.note,
                saved_at = excluded.saved_at
            "#,
            params![
                context_id,
                json,
                note,
                snapshot.saved_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ],
        )?;

        debug!(
            "历史快照已保存: context_id={}, entries={}",
            context_id,
            snapshot.entries.len()
        );
        Ok(rows > 0)
    }

    /// 最近一次保存时的备注
    pub fn find_note(&self, context_id: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let note: Option<Option<String>> = conn
            .query_row(
                "SELECT note FROM history_snapshot WHERE context_id = ?1",
                params![context_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(note.flatten())
    }

    /// 已保存快照的上下文列表
    pub fn list_contexts(&self) -> RepositoryResult<Vec<String>> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT context_id FROM history_snapshot ORDER BY context_id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(ids)
    }
}
