//! 请求日志模块
//!
//! 每个转发请求一条记录的持久化存储、历史查询、窗口统计

mod handlers;
pub mod model;
mod router;
pub mod stats;
pub mod store;
pub mod types;

pub use router::create_request_log_router;
pub use store::{RequestLog, RequestStore, SqliteRequestStore};
