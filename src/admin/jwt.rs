//! JWT Token 管理模块
//!
//! 提供 JWT Token 的生成和验证功能

use anyhow::{Result, anyhow};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// 管理员角色名
pub const ADMIN_ROLE: &str = "admin";

/// JWT Claims 结构
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject（用户名）
    pub sub: String,
    /// 角色
    pub role: String,
    /// 签发时间 (Unix timestamp)
    pub iat: usize,
    /// 过期时间 (Unix timestamp)
    pub exp: usize,
}

/// 从配置的密钥派生 HMAC 密钥
///
/// 使用 SHA256 哈希配置值作为 JWT 签名密钥
fn derive_secret_key(secret: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.finalize().to_vec()
}

/// Token 有效期上限（秒），exp 需要能放进 i64 时间戳
pub const MAX_EXPIRY_SECONDS: u64 = i64::MAX as u64 / 2;

/// JWT 管理器
#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    expiry_seconds: u64,
}

impl JwtManager {
    /// 有效期换算成秒后超出 [`MAX_EXPIRY_SECONDS`] 时返回错误
    pub fn new(secret: &str, algorithm: Algorithm, expiry_minutes: u64) -> Result<Self> {
        let expiry_seconds = expiry_minutes
            .checked_mul(60)
            .filter(|s| *s <= MAX_EXPIRY_SECONDS)
            .ok_or_else(|| anyhow!("token 有效期过长: {} 分钟", expiry_minutes))?;

        let key = derive_secret_key(secret);
        Ok(Self {
            encoding_key: EncodingKey::from_secret(&key),
            decoding_key: DecodingKey::from_secret(&key),
            algorithm,
            expiry_seconds,
        })
    }

    /// 生成 JWT Token
    ///
    /// # Returns
    /// * `Ok((token, expires_in))` - JWT Token 字符串和过期秒数
    pub fn generate_token(&self, sub: &str, role: &str) -> Result<(String, u64)> {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)?
            .as_secs();

        let claims = Claims {
            sub: sub.to_string(),
            role: role.to_string(),
            iat: now as usize,
            exp: now
                .checked_add(self.expiry_seconds)
                .and_then(|exp| usize::try_from(exp).ok())
                .ok_or_else(|| anyhow!("token 过期时间溢出"))?,
        };

        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding_key)?;

        Ok((token, self.expiry_seconds))
    }

    /// 验证 JWT Token
    ///
    /// # Returns
    /// * `Ok(Claims)` - 验证成功，返回 Claims
    /// * `Err(_)` - 验证失败（过期、签名错误、字段为空等）
    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let token_data = decode::<Claims>(
            token,
            &self.decoding_key,
            &Validation::new(self.algorithm),
        )
        .map_err(|e| anyhow!("Invalid token: {}", e))?;

        let claims = token_data.claims;
        if claims.sub.is_empty() || claims.role.is_empty() {
            return Err(anyhow!("Invalid token: missing subject or role"));
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_and_verify_token() {
        let manager = JwtManager::new("test-secret-12345", Algorithm::HS256, 60).unwrap();

        let (token, expires_in) = manager.generate_token("admin", ADMIN_ROLE).unwrap();
        assert!(!token.is_empty());
        assert_eq!(expires_in, 3600);

        let claims = manager.verify_token(&token).unwrap();
        assert_eq!(claims.sub, "admin");
        assert_eq!(claims.role, ADMIN_ROLE);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_verify_token_with_wrong_secret() {
        let manager = JwtManager::new("test-secret-12345", Algorithm::HS256, 60).unwrap();
        let other = JwtManager::new("wrong-secret", Algorithm::HS256, 60).unwrap();

        let (token, _) = manager.generate_token("admin", ADMIN_ROLE).unwrap();

        // 使用错误的密钥验证应该失败
        assert!(other.verify_token(&token).is_err());
    }

    #[test]
    fn test_verify_token_with_other_algorithm() {
        let hs256 = JwtManager::new("same-secret", Algorithm::HS256, 60).unwrap();
        let hs512 = JwtManager::new("same-secret", Algorithm::HS512, 60).unwrap();

        let (token, _) = hs256.generate_token("admin", ADMIN_ROLE).unwrap();
        assert!(hs512.verify_token(&token).is_err());
    }

    #[test]
    fn test_verify_invalid_token() {
        let manager = JwtManager::new("test-secret-12345", Algorithm::HS256, 60).unwrap();
        assert!(manager.verify_token("invalid.token.here").is_err());
    }

    #[test]
    fn test_new_rejects_overflowing_expiry() {
        assert!(JwtManager::new("s", Algorithm::HS256, u64::MAX / 30).is_err());
        assert!(JwtManager::new("s", Algorithm::HS256, u64::MAX).is_err());
        assert!(JwtManager::new("s", Algorithm::HS256, MAX_EXPIRY_SECONDS / 60 + 1).is_err());
    }

    #[test]
    fn test_long_expiry_still_issues_valid_token() {
        // 十年有效期
        let manager = JwtManager::new("s", Algorithm::HS256, 10 * 365 * 24 * 60).unwrap();
        let (token, expires_in) = manager.generate_token("admin", ADMIN_ROLE).unwrap();
        assert_eq!(expires_in, 10 * 365 * 24 * 3600);

        let claims = manager.verify_token(&token).unwrap();
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_derive_secret_key_consistency() {
        let secret1 = derive_secret_key("test-key");
        let secret2 = derive_secret_key("test-key");

        // 相同的输入应该产生相同的密钥
        assert_eq!(secret1, secret2);
        assert_eq!(secret1.len(), 32); // SHA256 输出 32 字节
    }
}
