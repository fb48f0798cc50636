// src/service/token_issuer.rs

use rand::Rng;
use sha2::{Digest, Sha256};

/// 検証用・取消用トークンの組（平文は通知にのみ使う）
#[derive(Debug, Clone)]
pub struct IssuedTokens {
    pub verification_token: String,
    pub verification_token_hash: String,
    pub cancellation_token: String,
    pub cancellation_token_hash: String,
}

/// Mints opaque single-use tokens. Only the SHA-256 digest is ever persisted.
#[derive(Debug, Clone, Default)]
pub struct TokenIssuer;

impl TokenIssuer {
    pub fn new() -> Self {
        Self
    }

    pub fn issue_pair(&self) -> IssuedTokens {
        let verification_token = self.generate_token();
        let cancellation_token = self.generate_token();
        IssuedTokens {
            verification_token_hash: hash_token(&verification_token),
            cancellation_token_hash: hash_token(&cancellation_token),
            verification_token,
            cancellation_token,
        }
    }

    /// 32バイトの乱数を16進文字列に
    fn generate_token(&self) -> String {
        let mut rng = rand::thread_rng();
        let bytes: [u8; 32] = rng.gen();
        hex::encode(bytes)
    }
}

pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}
