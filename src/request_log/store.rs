//! 请求记录存储和异步服务

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::Connection;

use super::model::{InputType, Mode, NewRequestRecord, RequestRecord};
use super::stats;
use super::types::StatsResponse;

/// 统计窗口：只看最近这么多条记录
pub const STATS_WINDOW: usize = 100;

/// 请求记录存储
///
/// 追加、按 id 倒序查询、整体清空。实现方自行保证并发写入安全
pub trait RequestStore: Send + Sync {
    /// 追加一条记录，返回分配的 id
    fn append(&self, record: &NewRequestRecord) -> Result<i64>;

    /// 按 id 倒序返回记录，`limit` 为空时返回全部
    fn list(&self, limit: Option<usize>) -> Result<Vec<RequestRecord>>;

    /// 删除全部记录，返回删除条数
    fn clear(&self) -> Result<u64>;
}

/// SQLite 存储（同步）
pub struct SqliteRequestStore {
    conn: Mutex<Connection>,
}

impl SqliteRequestStore {
    pub fn open(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS request_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                created_at TEXT NOT NULL,
                endpoint TEXT NOT NULL DEFAULT '/forward',
                mode TEXT NOT NULL DEFAULT 'unknown',
                input_type TEXT NOT NULL DEFAULT 'unknown',
                prompt_len INTEGER NOT NULL DEFAULT 0,
                token_count INTEGER NOT NULL DEFAULT 0,
                image_w INTEGER,
                image_h INTEGER,
                duration_ms REAL NOT NULL DEFAULT 0,
                status_code INTEGER NOT NULL DEFAULT 200,
                error TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_request_logs_status ON request_logs(status_code);",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl RequestStore for SqliteRequestStore {
    fn append(&self, record: &NewRequestRecord) -> Result<i64> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO request_logs (created_at, endpoint, mode, input_type, prompt_len, token_count, image_w, image_h, duration_ms, status_code, error)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            rusqlite::params![
                Utc::now(),
                record.endpoint,
                record.mode.as_str(),
                record.input_type.as_str(),
                record.prompt_len,
                record.token_count,
                record.image_w,
                record.image_h,
                record.duration_ms,
                record.status_code,
                record.error,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn list(&self, limit: Option<usize>) -> Result<Vec<RequestRecord>> {
        let conn = self.conn.lock();
        // SQLite 中 LIMIT -1 表示不限制
        let limit = limit.map(|l| l as i64).unwrap_or(-1);

        let mut stmt = conn.prepare(
            "SELECT id, created_at, endpoint, mode, input_type, prompt_len, token_count, image_w, image_h, duration_ms, status_code, error
             FROM request_logs ORDER BY id DESC LIMIT ?1",
        )?;
        let records = stmt
            .query_map([limit], |row| {
                let mode: String = row.get(3)?;
                let input_type: String = row.get(4)?;
                Ok(RequestRecord {
                    id: row.get(0)?,
                    created_at: row.get(1)?,
                    endpoint: row.get(2)?,
                    mode: Mode::from_db(&mode),
                    input_type: InputType::from_db(&input_type),
                    prompt_len: row.get(5)?,
                    token_count: row.get(6)?,
                    image_w: row.get(7)?,
                    image_h: row.get(8)?,
                    duration_ms: row.get(9)?,
                    status_code: row.get(10)?,
                    error: row.get(11)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    fn clear(&self) -> Result<u64> {
        let conn = self.conn.lock();
        let count = conn.execute("DELETE FROM request_logs", [])?;
        Ok(count as u64)
    }
}

/// 异步请求日志服务（公开 API）
///
/// 存储调用都是阻塞的，统一放到 blocking 线程池执行
pub struct RequestLog {
    store: Arc<dyn RequestStore>,
}

impl RequestLog {
    pub fn new(store: Arc<dyn RequestStore>) -> Self {
        Self { store }
    }

    /// 打开（或创建）SQLite 数据库
    pub fn open_sqlite(db_path: &str) -> Result<Self> {
        Ok(Self::new(Arc::new(SqliteRequestStore::open(db_path)?)))
    }

    /// 追加一条记录
    pub async fn append(&self, record: NewRequestRecord) -> Result<i64> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.append(&record)).await?
    }

    /// 全部历史记录（最新在前）
    pub async fn history(&self) -> Result<Vec<RequestRecord>> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.list(None)).await?
    }

    /// 最近 `limit` 条记录（最新在前）
    pub async fn recent(&self, limit: usize) -> Result<Vec<RequestRecord>> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.list(Some(limit))).await?
    }

    /// 清空记录
    pub async fn clear(&self) -> Result<u64> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.clear()).await?
    }

    /// 最近窗口内的统计信息
    pub async fn stats(&self) -> Result<StatsResponse> {
        let rows = self.recent(STATS_WINDOW).await?;
        Ok(stats::summarize(&rows))
    }
}
