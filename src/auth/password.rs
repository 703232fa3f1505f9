use anyhow::Context;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// bcrypt is CPU bound, so it runs on the blocking pool.
pub async fn hash_password(plain: &str, cost: u32) -> anyhow::Result<String> {
    let plain = plain.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(plain, cost))
        .await
        .context("password hashing task failed")?
        .context("failed to hash password")
}

pub async fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let plain = plain.to_string();
    let hash = hash.to_string();
    tokio::task::spawn_blocking(move || bcrypt::verify(plain, &hash))
        .await
        .context("password verification task failed")?
        .context("stored password hash is malformed")
}

/// Fresh reset token: (raw value for the email, SHA-256 hex to store)
pub fn generate_reset_token() -> (String, String) {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    let raw: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
    let hashed = hash_reset_token(&raw);
    (raw, hashed)
}

pub fn hash_reset_token(raw: &str) -> String {
    format!("{:x}", Sha256::digest(raw.as_bytes()))
}
