mod admin;
mod app;
mod common;
mod forward;
mod generation;
mod model;
mod request_log;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use model::arg::Args;
use model::config::Config;
use request_log::RequestLog;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // .env 要在日志初始化之前加载，RUST_LOG 可以写在里面
    match &args.env_file {
        Some(path) => dotenvy::from_path(path).with_context(|| format!("读取 {} 失败", path))?,
        None => {
            dotenvy::dotenv().ok();
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config_path = args
        .config
        .unwrap_or_else(|| Config::default_config_path().to_string());
    let mut config = Config::load(&config_path)?;
    config.apply_env_overrides();
    config.validate()?;

    if let Some(path) = config.config_path().filter(|p| p.exists()) {
        tracing::info!("已加载配置文件: {}", path.display());
    } else {
        tracing::info!("配置文件 {} 不存在，使用默认配置", config_path);
    }

    let log = Arc::new(RequestLog::open_sqlite(&config.db_path)?);
    tracing::info!("请求记录数据库: {}", config.db_path);

    let backend = generation::build_backend(&config)?;
    tracing::info!("生成后端: {}", backend.name());

    let app = app::create_app(&config, log, backend)?;

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("监听 {} 失败", addr))?;
    tracing::info!("服务已启动: http://{}", addr);
    tracing::info!("  POST /forward");
    tracing::info!("  POST /auth/login");
    tracing::info!("  GET|DELETE /history, GET /stats");

    axum::serve(listener, app).await?;
    Ok(())
}
