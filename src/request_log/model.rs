//! 请求记录数据模型

use chrono::{DateTime, Utc};
use serde::Serialize;

/// 转发端点路径，所有记录的 endpoint 字段都是它
pub const FORWARD_ENDPOINT: &str = "/forward";

/// 生成模式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// 文生图
    T2i,
    /// 图生图
    I2i,
    #[default]
    Unknown,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::T2i => "t2i",
            Mode::I2i => "i2i",
            Mode::Unknown => "unknown",
        }
    }

    /// 从数据库值解析，未知值回退为 Unknown
    pub fn from_db(s: &str) -> Self {
        match s {
            "t2i" => Mode::T2i,
            "i2i" => Mode::I2i,
            _ => Mode::Unknown,
        }
    }
}

/// 请求体类型
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    Json,
    Multipart,
    #[default]
    Unknown,
}

impl InputType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputType::Json => "json",
            InputType::Multipart => "multipart",
            InputType::Unknown => "unknown",
        }
    }

    pub fn from_db(s: &str) -> Self {
        match s {
            "json" => InputType::Json,
            "multipart" => InputType::Multipart,
            _ => InputType::Unknown,
        }
    }
}

/// 待写入的请求记录（id 和 created_at 由存储层分配）
#[derive(Debug, Clone, PartialEq)]
pub struct NewRequestRecord {
    pub endpoint: String,
    pub mode: Mode,
    pub input_type: InputType,
    pub prompt_len: i64,
    pub token_count: i64,
    pub image_w: Option<i64>,
    pub image_h: Option<i64>,
    pub duration_ms: f64,
    pub status_code: u16,
    pub error: Option<String>,
}

/// 已持久化的请求记录
#[derive(Debug, Clone, Serialize)]
pub struct RequestRecord {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub endpoint: String,
    pub mode: Mode,
    pub input_type: InputType,
    pub prompt_len: i64,
    pub token_count: i64,
    pub image_w: Option<i64>,
    pub image_h: Option<i64>,
    pub duration_ms: f64,
    pub status_code: u16,
    pub error: Option<String>,
}
