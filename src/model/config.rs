use anyhow::{Context, bail};
use jsonwebtoken::Algorithm;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::admin::jwt::MAX_EXPIRY_SECONDS;

/// 服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// SQLite 数据库文件路径（`:memory:` 表示内存库）
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// JWT 签名密钥（实际 HMAC 密钥由其 SHA256 派生）
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,

    /// JWT 算法，仅支持 HS256 / HS384 / HS512
    #[serde(default = "default_jwt_alg")]
    pub jwt_alg: String,

    /// Access Token 有效期（分钟）
    #[serde(default = "default_access_token_expire_minutes")]
    pub access_token_expire_minutes: u64,

    #[serde(default = "default_admin_user")]
    pub admin_user: String,

    /// 管理员密码，可以是明文或 bcrypt 哈希（`$2b$...`）
    #[serde(default = "default_admin_pass")]
    pub admin_pass: String,

    /// 清空历史记录时 `x-confirm-token` 需要匹配的值
    #[serde(default = "default_history_delete_token")]
    pub history_delete_token: String,

    /// 远端生成服务使用的模型 ID
    #[serde(default = "default_model_id")]
    pub model_id: String,

    /// 远端生成服务地址（OpenAI 兼容 images API）
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_url: Option<String>,

    /// 远端生成请求超时（秒）
    #[serde(default = "default_generation_timeout_secs")]
    pub generation_timeout_secs: u64,

    /// 使用占位图后端，不依赖任何模型服务
    #[serde(default)]
    pub use_dummy_model: bool,

    /// 请求体大小上限（字节），主要限制上传图片
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// 配置文件路径（运行时元数据，不写入 JSON）
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_db_path() -> String {
    "service.db".to_string()
}

fn default_jwt_secret() -> String {
    "change-me".to_string()
}

fn default_jwt_alg() -> String {
    "HS256".to_string()
}

fn default_access_token_expire_minutes() -> u64 {
    1440
}

fn default_admin_user() -> String {
    "admin".to_string()
}

fn default_admin_pass() -> String {
    "admin".to_string()
}

fn default_history_delete_token() -> String {
    "change-me-too".to_string()
}

fn default_model_id() -> String {
    "black-forest-labs/FLUX.1-schnell".to_string()
}

fn default_generation_timeout_secs() -> u64 {
    300
}

fn default_max_body_bytes() -> usize {
    20 * 1024 * 1024
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            db_path: default_db_path(),
            jwt_secret: default_jwt_secret(),
            jwt_alg: default_jwt_alg(),
            access_token_expire_minutes: default_access_token_expire_minutes(),
            admin_user: default_admin_user(),
            admin_pass: default_admin_pass(),
            history_delete_token: default_history_delete_token(),
            model_id: default_model_id(),
            generation_url: None,
            generation_timeout_secs: default_generation_timeout_secs(),
            use_dummy_model: false,
            max_body_bytes: default_max_body_bytes(),
            config_path: None,
        }
    }
}

impl Config {
    /// 获取默认配置文件路径
    pub fn default_config_path() -> &'static str {
        "config.json"
    }

    /// 从文件加载配置
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            // 配置文件不存在，返回默认配置
            let mut config = Self::default();
            config.config_path = Some(path.to_path_buf());
            return Ok(config);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
        let mut config: Config = serde_json::from_str(&content)
            .with_context(|| format!("解析配置文件失败: {}", path.display()))?;
        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// 获取配置文件路径（如果有）
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// 用进程环境变量覆盖配置
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// 用任意键值来源覆盖配置
    ///
    /// 无法解析的数值保持原值并输出警告
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("HOST") {
            self.host = v;
        }
        override_parsed(&lookup, "PORT", &mut self.port);
        if let Some(v) = lookup("DB_PATH").or_else(|| lookup("DB_URL")) {
            self.db_path = normalize_db_path(&v);
        }
        if let Some(v) = lookup("JWT_SECRET") {
            self.jwt_secret = v;
        }
        if let Some(v) = lookup("JWT_ALG") {
            self.jwt_alg = v;
        }
        override_parsed(
            &lookup,
            "ACCESS_TOKEN_EXPIRE_MINUTES",
            &mut self.access_token_expire_minutes,
        );
        if let Some(v) = lookup("ADMIN_USER") {
            self.admin_user = v;
        }
        if let Some(v) = lookup("ADMIN_PASS") {
            self.admin_pass = v;
        }
        if let Some(v) = lookup("HISTORY_DELETE_TOKEN") {
            self.history_delete_token = v;
        }
        if let Some(v) = lookup("MODEL_ID") {
            self.model_id = v;
        }
        if let Some(v) = lookup("GENERATION_URL") {
            let v = v.trim().to_string();
            self.generation_url = if v.is_empty() { None } else { Some(v) };
        }
        override_parsed(
            &lookup,
            "GENERATION_TIMEOUT_SECS",
            &mut self.generation_timeout_secs,
        );
        if let Some(v) = lookup("USE_DUMMY_MODEL").or_else(|| lookup("DUMMY")) {
            self.use_dummy_model = is_truthy(&v);
        }
        override_parsed(&lookup, "MAX_BODY_BYTES", &mut self.max_body_bytes);
    }

    /// 解析 JWT 算法
    pub fn jwt_algorithm(&self) -> anyhow::Result<Algorithm> {
        let alg = Algorithm::from_str(self.jwt_alg.trim())
            .map_err(|_| anyhow::anyhow!("不支持的 JWT 算法: {}", self.jwt_alg))?;
        match alg {
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => Ok(alg),
            _ => bail!("仅支持 HMAC 类 JWT 算法（HS256/HS384/HS512），当前为: {}", self.jwt_alg),
        }
    }

    /// 启动前校验配置
    pub fn validate(&self) -> anyhow::Result<()> {
        self.jwt_algorithm()?;
        if !self.use_dummy_model && self.generation_url.is_none() {
            bail!("未配置 generationUrl，且未启用 useDummyModel");
        }
        if self.max_body_bytes == 0 {
            bail!("maxBodyBytes 必须大于 0");
        }
        let expiry_ok = self
            .access_token_expire_minutes
            .checked_mul(60)
            .is_some_and(|s| s > 0 && s <= MAX_EXPIRY_SECONDS);
        if !expiry_ok {
            bail!(
                "accessTokenExpireMinutes 超出范围: {}",
                self.access_token_expire_minutes
            );
        }
        Ok(())
    }
}

fn override_parsed<F, T>(lookup: &F, key: &str, target: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(raw) = lookup(key) {
        match raw.trim().parse::<T>() {
            Ok(v) => *target = v,
            Err(_) => tracing::warn!("环境变量 {} 的值无法解析，忽略: {}", key, raw),
        }
    }
}

fn is_truthy(v: &str) -> bool {
    matches!(
        v.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "on"
    )
}

/// 兼容 `sqlite:///./service.db` 形式的数据库 URL
fn normalize_db_path(v: &str) -> String {
    let v = v.trim();
    v.strip_prefix("sqlite:///")
        .or_else(|| v.strip_prefix("sqlite://"))
        .unwrap_or(v)
        .to_string()
}
