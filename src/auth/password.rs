use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use anyhow::Context;
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use tokio::task;
use tracing::{error, warn};

lazy_static! {
    /// Verified against when the account does not exist, so unknown emails cost the same.
    static ref DUMMY_HASH: String =
        hash_password("smartpantry-dummy-password").unwrap_or_default();
}

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

/// Returns `false` for a wrong password and for any hash that does not parse.
pub fn verify_password(plain: &str, hash: &str) -> bool {
    let parsed = match PasswordHash::new(hash) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "stored password hash is not a valid PHC string");
            return false;
        }
    };
    Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok()
}

/// Hash on the blocking pool; Argon2 would otherwise stall an async worker.
pub async fn hash_password_blocking(plain: &str) -> anyhow::Result<String> {
    let plain = plain.to_string();
    task::spawn_blocking(move || hash_password(&plain))
        .await
        .context("password hashing task panicked")?
}

/// Verify on the blocking pool. With no stored hash the dummy hash is checked
/// instead and the result is always `false`.
pub async fn verify_password_blocking(plain: &str, hash: Option<&str>) -> anyhow::Result<bool> {
    let plain = plain.to_string();
    let stored = hash.map(str::to_string);
    task::spawn_blocking(move || match stored {
        Some(hash) => verify_password(&plain, &hash),
        None => {
            let _ = verify_password(&plain, &DUMMY_HASH);
            false
        }
    })
    .await
    .context("password verification task panicked")
}
