// ==========================================
// 订单行缺货处理 - SQLite 连接与建库
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout,减少并发写入时的偶发 busy 错误
// - 首次打开时建表 (幂等)
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;
use tracing::{info, warn};

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS config_kv (
    scope_id   TEXT NOT NULL,
    key        TEXT NOT NULL,
    value      TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (scope_id, key)
);

CREATE TABLE IF NOT EXISTS history_snapshot (
    context_id    TEXT PRIMARY KEY,
    snapshot_json TEXT NOT NULL,
    note          TEXT,
    saved_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS decision_log (
    log_id                 TEXT PRIMARY KEY,
    context_id             TEXT NOT NULL,
    line_id                TEXT NOT NULL,
    rule_id                TEXT NOT NULL,
    actor_role             TEXT NOT NULL,
    actor                  TEXT,
    status_before          TEXT NOT NULL,
    status_after           TEXT NOT NULL,
    logged_at              TEXT NOT NULL,
    params_json            TEXT,
    notification_tag       TEXT NOT NULL,
    notification_delivered INTEGER NOT NULL,
    note                   TEXT
);

CREATE INDEX IF NOT EXISTS idx_decision_log_context ON decision_log (context_id, logged_at);
CREATE INDEX IF NOT EXISTS idx_decision_log_line ON decision_log (context_id, line_id);

CREATE TABLE IF NOT EXISTS schema_version (
    version    INTEGER NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 建表并登记 schema_version (已存在时不重复登记)
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    match read_schema_version(conn)? {
        None => {
            conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                [CURRENT_SCHEMA_VERSION],
            )?;
            info!("数据库已初始化: schema_version={}", CURRENT_SCHEMA_VERSION);
        }
        Some(v) if v != CURRENT_SCHEMA_VERSION => {
            warn!(
                "schema_version 不匹配: db={}, expected={}",
                v, CURRENT_SCHEMA_VERSION
            );
        }
        Some(_) => {}
    }
    Ok(())
}

/// 打开连接并确保表结构存在
pub fn open_and_init(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = open_sqlite_connection(db_path)?;
    init_schema(&conn)?;
    Ok(conn)
}

/// 读取 schema_version（若表不存在或为空则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}
