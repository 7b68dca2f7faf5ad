// ==========================================
// 订单行缺货处理 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写
// 存储: config_kv 表 (key-value + scope)
// 覆写顺序: 环境变量 > config_kv(global) > 默认值
// ==========================================

use crate::db::open_sqlite_connection;
use crate::engine::dispatcher::{DeliveryPolicy, HttpDispatchConfig, DEFAULT_SOFT_SUCCESS_STATUSES};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;

/// 默认通知超时（毫秒）
pub const DEFAULT_NOTIFY_TIMEOUT_MS: u64 = 10_000;

/// 环境变量: 数据库路径
pub const ENV_DB_PATH: &str = "SHORTAGE_WORKFLOW_DB_PATH";
/// 环境变量: 通知地址 (覆盖 notify_endpoint)
pub const ENV_NOTIFY_URL: &str = "SHORTAGE_WORKFLOW_NOTIFY_URL";

// ==========================================
// WorkflowConfig - 类型化配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowConfig {
    pub notify_endpoint: Option<String>,
    pub notify_timeout_ms: u64,
    pub notify_soft_success_statuses: Vec<u16>,
    pub notify_enabled: bool,
    pub notify_strict: bool,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            notify_endpoint: None,
            notify_timeout_ms: DEFAULT_NOTIFY_TIMEOUT_MS,
            notify_soft_success_statuses: DEFAULT_SOFT_SUCCESS_STATUSES.to_vec(),
            notify_enabled: true,
            notify_strict: false,
        }
    }
}

impl WorkflowConfig {
    /// HTTP 分发配置 (未启用或未配置地址时为 None)
    pub fn http_dispatch_config(&self) -> Option<HttpDispatchConfig> {
        if !self.notify_enabled {
            return None;
        }
        let endpoint = self.notify_endpoint.as_deref()?;

        let mut config = HttpDispatchConfig::new(endpoint);
        config.timeout = Some(Duration::from_millis(self.notify_timeout_ms));
        config.soft_success_statuses = self.notify_soft_success_statuses.clone();
        config.policy = if self.notify_strict {
            DeliveryPolicy::Strict
        } else {
            DeliveryPolicy::FireAndForget
        };
        Some(config)
    }
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        crate::db::init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            crate::db::configure_sqlite_connection(&guard)?;
        }

        Ok(Self { conn })
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 读取 global scope 的配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 写入 global scope 的配置值 (UPSERT)
    pub fn set_global_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    fn get_config_or_default(&self, key: &str, default: &str) -> RepositoryResult<String> {
        Ok(self
            .get_global_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// 获取所有 global 配置的快照（JSON 字符串）
    pub fn get_config_snapshot(&self) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }

    // ===== 通知配置 =====

    /// 通知地址 (环境变量优先; 空串视为未配置)
    pub fn get_notify_endpoint(&self) -> RepositoryResult<Option<String>> {
        if let Ok(url) = std::env::var(ENV_NOTIFY_URL) {
            let trimmed = url.trim();
            if !trimmed.is_empty() {
                return Ok(Some(trimmed.to_string()));
            }
        }

        Ok(self
            .get_global_config_value(config_keys::NOTIFY_ENDPOINT)?
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty()))
    }

    pub fn get_notify_timeout_ms(&self) -> RepositoryResult<u64> {
        let default = DEFAULT_NOTIFY_TIMEOUT_MS.to_string();
        let value = self.get_config_or_default(config_keys::NOTIFY_TIMEOUT_MS, &default)?;
        Ok(value.trim().parse::<u64>().unwrap_or(DEFAULT_NOTIFY_TIMEOUT_MS))
    }

    /// 软成功状态码 (JSON 数组)
    pub fn get_soft_success_statuses(&self) -> RepositoryResult<Vec<u16>> {
        let value = match self.get_global_config_value(config_keys::NOTIFY_SOFT_SUCCESS_STATUSES)? {
            Some(v) => v,
            None => return Ok(DEFAULT_SOFT_SUCCESS_STATUSES.to_vec()),
        };

        let statuses = serde_json::from_str::<Vec<u16>>(&value).unwrap_or_else(|_| {
            warn!(
                config_key = config_keys::NOTIFY_SOFT_SUCCESS_STATUSES,
                raw_value = %value,
                "软成功状态码配置格式错误，使用默认值"
            );
            DEFAULT_SOFT_SUCCESS_STATUSES.to_vec()
        });
        Ok(statuses)
    }

    pub fn get_notify_enabled(&self) -> RepositoryResult<bool> {
        let value = self.get_config_or_default(config_keys::NOTIFY_ENABLED, "true")?;
        Ok(parse_bool(&value).unwrap_or(true))
    }

    pub fn get_notify_strict(&self) -> RepositoryResult<bool> {
        let value = self.get_config_or_default(config_keys::NOTIFY_STRICT, "false")?;
        Ok(parse_bool(&value).unwrap_or(false))
    }

    /// 汇总为类型化配置
    pub fn get_workflow_config(&self) -> RepositoryResult<WorkflowConfig> {
        Ok(WorkflowConfig {
            notify_endpoint: self.get_notify_endpoint()?,
            notify_timeout_ms: self.get_notify_timeout_ms()?,
            notify_soft_success_statuses: self.get_soft_success_statuses()?,
            notify_enabled: self.get_notify_enabled()?,
            notify_strict: self.get_notify_strict()?,
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

// ==========================================
// 默认数据库路径
// ==========================================

/// 获取默认数据库路径
///
/// # 返回
/// - 环境变量 SHORTAGE_WORKFLOW_DB_PATH (非空时)
/// - 否则: 用户数据目录/shortage-workflow/shortage_workflow.db
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var(ENV_DB_PATH) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./shortage_workflow.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("shortage-workflow");
        // 目录创建失败时后续打开连接会报错
        std::fs::create_dir_all(&dir).ok();
        path = dir.join("shortage_workflow.db");
    }

    path.to_string_lossy().to_string()
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 通知分发
    pub const NOTIFY_ENDPOINT: &str = "notify_endpoint";
    pub const NOTIFY_TIMEOUT_MS: &str = "notify_timeout_ms";
    pub const NOTIFY_SOFT_SUCCESS_STATUSES: &str = "notify_soft_success_statuses"; // JSON 数组
    pub const NOTIFY_ENABLED: &str = "notify_enabled";
    pub const NOTIFY_STRICT: &str = "notify_strict"; // true → DeliveryPolicy::Strict
}
