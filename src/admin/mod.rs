//! Admin 模块
//!
//! # 功能
//! - 管理员登录，签发 JWT
//! - 管理接口认证中间件

mod auth_handlers;
pub mod jwt;
mod middleware;
mod router;
pub mod types;

pub use jwt::JwtManager;
pub use middleware::{AdminState, admin_auth_middleware};
pub use router::create_auth_router;
