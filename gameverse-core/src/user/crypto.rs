//! 密码与随机 token 工具函数

use crate::error::{GameVerseError, Result};
use bcrypt::{hash, verify};
use rand::RngCore;

/// 异步哈希密码（在阻塞线程中执行 bcrypt）
pub async fn hash_password(password: &str, cost: u32) -> Result<String> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || hash(&password, cost))
        .await
        .map_err(|e| GameVerseError::Other(format!("spawn_blocking failed: {}", e)))?
        .map_err(|e| GameVerseError::Other(format!("bcrypt hash failed: {}", e)))
}

/// 异步验证密码（在阻塞线程中执行 bcrypt）
pub async fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let password = password.to_string();
    let hash = hash.to_string();
    tokio::task::spawn_blocking(move || verify(&password, &hash))
        .await
        .map_err(|e| GameVerseError::Other(format!("spawn_blocking failed: {}", e)))?
        .map_err(|e| GameVerseError::Other(format!("bcrypt verify failed: {}", e)))
}

/// 32 字节随机数的十六进制表示，用作邮箱验证 token
pub fn generate_verification_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_then_verify() {
        let hashed = hash_password("test123456", 4).await.unwrap();
        assert_ne!(hashed, "test123456");
        assert!(verify_password("test123456", &hashed).await.unwrap());
        assert!(!verify_password("wrong", &hashed).await.unwrap());
    }

    #[test]
    fn verification_tokens_are_unique_hex() {
        let a = generate_verification_token();
        let b = generate_verification_token();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }
}
