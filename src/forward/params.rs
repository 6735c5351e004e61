//! 请求参数提取
//!
//! JSON 路径从请求体取参数，multipart 路径从自定义请求头取参数。
//! 请求头都是字符串，解析失败一律回退默认值，从不报错

use axum::http::HeaderMap;
use serde_json::{Map, Value};

use super::error::ForwardError;

pub const DEFAULT_SIZE: u32 = 512;
pub const DEFAULT_STEPS: u32 = 20;
pub const DEFAULT_STRENGTH: f32 = 0.6;
pub const DEFAULT_DEVICE: &str = "auto";

pub const HEADER_DEVICE: &str = "x-device";
pub const HEADER_PROMPT: &str = "x-prompt";
pub const HEADER_STEPS: &str = "x-steps";
pub const HEADER_SEED: &str = "x-seed";
pub const HEADER_STRENGTH: &str = "x-strength";

/// 文生图参数（来自 JSON 请求体）
#[derive(Debug, Clone, PartialEq)]
pub struct TextParams {
    pub prompt: String,
    pub width: u32,
    pub height: u32,
    pub steps: u32,
    pub seed: Option<i64>,
}

impl TextParams {
    pub fn from_json(body: &[u8]) -> Result<Self, ForwardError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| ForwardError::bad_request(format!("invalid json: {}", e)))?;
        let obj = value
            .as_object()
            .ok_or_else(|| ForwardError::bad_request("json body must be an object"))?;

        let prompt = match obj.get("prompt") {
            Some(Value::String(p)) if !p.trim().is_empty() => p.clone(),
            _ => return Err(ForwardError::bad_request("prompt missing or blank")),
        };

        Ok(Self {
            prompt,
            width: positive_field(obj, "width", DEFAULT_SIZE)?,
            height: positive_field(obj, "height", DEFAULT_SIZE)?,
            steps: positive_field(obj, "steps", DEFAULT_STEPS)?,
            seed: match obj.get("seed") {
                None | Some(Value::Null) => None,
                Some(v) => Some(
                    json_int(v).ok_or_else(|| ForwardError::bad_request("invalid seed"))?,
                ),
            },
        })
    }
}

/// 图生图参数（来自请求头）
#[derive(Debug, Clone, PartialEq)]
pub struct ImageParams {
    /// 已去除首尾空白
    pub prompt: String,
    pub steps: u32,
    pub seed: Option<i64>,
    pub strength: f32,
}

impl ImageParams {
    /// `x-prompt` 缺失或为空时返回 BadRequest，其余字段解析失败回退默认值
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, ForwardError> {
        let prompt = header_str(headers, HEADER_PROMPT)
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ForwardError::bad_request("x-prompt header missing or blank"))?
            .to_string();

        Ok(Self {
            prompt,
            steps: header_u32(headers, HEADER_STEPS, DEFAULT_STEPS),
            seed: header_opt_i64(headers, HEADER_SEED),
            strength: header_f32(headers, HEADER_STRENGTH, DEFAULT_STRENGTH),
        })
    }
}

/// 设备偏好，默认 auto
pub fn device_preference(headers: &HeaderMap) -> String {
    header_str(headers, HEADER_DEVICE)
        .unwrap_or(DEFAULT_DEVICE)
        .to_string()
}

/// 读取请求头为 UTF-8 字符串（prompt 可能包含非 ASCII 字符）
pub fn header_str<'a>(headers: &'a HeaderMap, key: &str) -> Option<&'a str> {
    headers
        .get(key)
        .and_then(|v| std::str::from_utf8(v.as_bytes()).ok())
}

pub fn header_u32(headers: &HeaderMap, key: &str, default: u32) -> u32 {
    header_str(headers, key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

pub fn header_opt_i64(headers: &HeaderMap, key: &str) -> Option<i64> {
    header_str(headers, key).and_then(|v| v.trim().parse().ok())
}

pub fn header_f32(headers: &HeaderMap, key: &str, default: f32) -> f32 {
    header_str(headers, key)
        .and_then(|v| v.trim().parse::<f32>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(default)
}

/// 宽松的整数转换：整数、浮点（向零截断）、数字字符串
fn json_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite())
                .map(|f| f.trunc() as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// 缺省取默认值；存在但不是正整数则 BadRequest
fn positive_field(obj: &Map<String, Value>, key: &str, default: u32) -> Result<u32, ForwardError> {
    match obj.get(key) {
        None => Ok(default),
        Some(v) => json_int(v)
            .and_then(|n| u32::try_from(n).ok())
            .filter(|n| *n > 0)
            .ok_or_else(|| ForwardError::bad_request(format!("invalid {}", key))),
    }
}

/// prompt 字符数
pub fn prompt_len(prompt: &str) -> i64 {
    prompt.chars().count() as i64
}

/// 按空白切分的词数
///
/// 除 Unicode 空白外，U+001C..=U+001F（文件/组/记录/单元分隔符）也算分隔符
pub fn token_count(prompt: &str) -> i64 {
    prompt
        .split(is_token_separator)
        .filter(|t| !t.is_empty())
        .count() as i64
}

fn is_token_separator(c: char) -> bool {
    c.is_whitespace() || ('\u{1c}'..='\u{1f}').contains(&c)
}
