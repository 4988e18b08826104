//! Adaptive-KDF password hashing (bcrypt, cost >= 12).

use rand::Rng;

use super::error::IdentityError;

const BCRYPT_COST: u32 = 12;

pub fn hash_password(password: &str) -> Result<String, IdentityError> {
    bcrypt::hash(password, BCRYPT_COST)
        .map_err(|e| IdentityError::Store(format!("failed to hash password: {e}")))
}

/// Constant-time (w.r.t. the comparison itself; bcrypt::verify already
/// does the constant-time compare internally) password check.
pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

/// Generates a high-entropy random password for default-user bootstrap.
pub fn generate_password() -> String {
    const CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz23456789!@#$%";
    let mut rng = rand::thread_rng();
    (0..24)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}
