//! 请求记录器
//!
//! 每个转发请求创建一个 [`RequestRecorder`]，处理过程中往 [`RecordDraft`] 里填字段，
//! 响应生成后调用 [`RequestRecorder::finish`] 落库。
//! 如果请求 future 在中途被丢弃（客户端断开、panic），`Drop` 会用当时的状态
//! 在后台补写一条记录。两条路径互斥，保证每个请求恰好写一次。
//! 写入失败只记日志，不影响客户端响应

use std::sync::Arc;
use std::time::Instant;

use axum::http::StatusCode;

use super::error::ForwardError;
use super::params;
use crate::common::truncate_chars;
use crate::request_log::RequestLog;
use crate::request_log::model::{FORWARD_ENDPOINT, InputType, Mode, NewRequestRecord};

/// 记录中 error 字段的最大字符数
pub const MAX_ERROR_CHARS: usize = 1000;

/// 处理过程中逐步填充的记录草稿
#[derive(Debug, Clone)]
pub struct RecordDraft {
    pub mode: Mode,
    pub input_type: InputType,
    pub prompt_len: i64,
    pub token_count: i64,
    pub image_w: Option<i64>,
    pub image_h: Option<i64>,
    /// 最近一次确定的状态码
    pub status_code: u16,
    pub error: Option<String>,
}

impl Default for RecordDraft {
    fn default() -> Self {
        Self {
            mode: Mode::Unknown,
            input_type: InputType::Unknown,
            prompt_len: 0,
            token_count: 0,
            image_w: None,
            image_h: None,
            status_code: StatusCode::OK.as_u16(),
            error: None,
        }
    }
}

impl RecordDraft {
    /// 内容类型匹配后收窄模式
    pub fn narrow(&mut self, mode: Mode, input_type: InputType) {
        self.mode = mode;
        self.input_type = input_type;
    }

    pub fn set_prompt(&mut self, prompt: &str) {
        self.prompt_len = params::prompt_len(prompt);
        self.token_count = params::token_count(prompt);
    }

    pub fn set_image_size(&mut self, width: u32, height: u32) {
        self.image_w = Some(width as i64);
        self.image_h = Some(height as i64);
    }

    /// 记录失败的状态码和（截断后的）错误信息
    pub fn fail(&mut self, err: &ForwardError) {
        self.status_code = err.status_code().as_u16();
        self.error = err
            .record_message()
            .map(|msg| truncate_chars(msg, MAX_ERROR_CHARS).to_string());
    }

    fn into_record(self, duration_ms: f64) -> NewRequestRecord {
        NewRequestRecord {
            endpoint: FORWARD_ENDPOINT.to_string(),
            mode: self.mode,
            input_type: self.input_type,
            prompt_len: self.prompt_len,
            token_count: self.token_count,
            image_w: self.image_w,
            image_h: self.image_h,
            duration_ms,
            status_code: self.status_code,
            error: self.error,
        }
    }
}

/// 单个请求的记录守卫
pub struct RequestRecorder {
    log: Arc<RequestLog>,
    started: Instant,
    draft: RecordDraft,
    finished: bool,
}

impl RequestRecorder {
    /// 在请求入口调用，起点时间从这里开始
    pub fn start(log: Arc<RequestLog>) -> Self {
        Self {
            log,
            started: Instant::now(),
            draft: RecordDraft::default(),
            finished: false,
        }
    }

    pub fn draft_mut(&mut self) -> &mut RecordDraft {
        &mut self.draft
    }

    /// 以最终响应的状态码落库
    pub async fn finish(mut self, status: StatusCode) {
        self.finished = true;
        self.draft.status_code = status.as_u16();
        let record = self.take_record();
        tracing::info!(
            mode = record.mode.as_str(),
            input_type = record.input_type.as_str(),
            status = record.status_code,
            duration_ms = record.duration_ms,
            "forward 请求完成"
        );
        persist(&self.log, record).await;
    }

    /// 取出草稿并计算耗时（紧贴落库之前）
    fn take_record(&mut self) -> NewRequestRecord {
        let duration_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        std::mem::take(&mut self.draft).into_record(duration_ms)
    }
}

impl Drop for RequestRecorder {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;

        let record = self.take_record();
        tracing::warn!(
            status = record.status_code,
            "forward 请求未正常结束，补写请求记录"
        );
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let log = self.log.clone();
                handle.spawn(async move {
                    persist(&log, record).await;
                });
            }
            Err(_) => tracing::warn!("没有可用的 tokio 运行时，放弃补写请求记录"),
        }
    }
}

/// 写入一条记录，失败只记日志
async fn persist(log: &RequestLog, record: NewRequestRecord) {
    if let Err(e) = log.append(record).await {
        tracing::warn!("写入请求记录失败（已忽略）: {:#}", e);
    }
}
