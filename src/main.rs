// ==========================================
// 订单行缺货处理 - 运维命令行
// ==========================================
// 用法:
//   shortage-workflow catalog              输出内置规则目录 (JSON)
//   shortage-workflow history <context_id> 输出上下文的历史快照 (JSON)
//   shortage-workflow log <context_id>     输出上下文的决策日志 (JSON)
//   shortage-workflow config               输出全局配置快照 (JSON)
// 数据库路径: SHORTAGE_WORKFLOW_DB_PATH 或用户数据目录
// ==========================================

use anyhow::{bail, Context, Result};
use shortage_workflow::config::{get_default_db_path, ConfigManager};
use shortage_workflow::db::open_and_init;
use shortage_workflow::engine::RuleCatalog;
use shortage_workflow::repository::{DecisionLogRepository, SqliteHistoryRepository};
use std::sync::{Arc, Mutex};

fn main() -> Result<()> {
    shortage_workflow::logging::init();

    let mut args = std::env::args().skip(1);
    let command = args.next().unwrap_or_else(|| "catalog".to_string());

    match command.as_str() {
        "catalog" => {
            let json = RuleCatalog::builtin().to_json()?;
            println!("{}", json);
        }
        "history" => {
            let context_id = args.next().context("用法: history <context_id>")?;
            let conn = open_db()?;
            let repo = SqliteHistoryRepository::new(conn);
            match repo.fetch_history(&context_id)? {
                Some(snapshot) => println!("{}", serde_json::to_string_pretty(&snapshot)?),
                None => {
                    tracing::info!("上下文尚无历史快照: context_id={}", context_id);
                    println!("null");
                }
            }
        }
        "log" => {
            let context_id = args.next().context("用法: log <context_id>")?;
            let conn = open_db()?;
            let repo = DecisionLogRepository::new(conn);
            let entries = repo.find_by_context(&context_id)?;
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        "config" => {
            let conn = open_db()?;
            let manager = ConfigManager::from_connection(conn)?;
            println!("{}", manager.get_config_snapshot()?);
        }
        other => bail!("未知命令: {} (可用: catalog | history | log | config)", other),
    }

    Ok(())
}

fn open_db() -> Result<Arc<Mutex<rusqlite::Connection>>> {
    let db_path = get_default_db_path();
    tracing::info!("使用数据库: {}", db_path);
    let conn = open_and_init(&db_path).with_context(|| format!("无法打开数据库: {}", db_path))?;
    Ok(Arc::new(Mutex::new(conn)))
}
