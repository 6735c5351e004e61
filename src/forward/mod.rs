//! 图像生成转发模块
//!
//! 单一端点按 Content-Type 分发：
//! - `application/json` 走文生图，参数在请求体
//! - `multipart/form-data` 走图生图，图片在 `image` 字段，参数在自定义请求头
//!
//! 每个请求无论成功、失败还是中途取消，都恰好写入一条请求记录

mod error;
mod handlers;
mod params;
mod recorder;
mod router;
mod types;

pub use router::{ForwardState, create_forward_router};
