//! Site password hashing and verification using Argon2id.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::error::AppError;

/// Hash a site password, returning the PHC string stored in `projects.password_hash`.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("failed to hash password: {e}")))
}

/// Check `password` against a stored PHC hash.
///
/// A stored hash that does not parse is an error, not a mismatch.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(format!("invalid password hash format: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// [`verify_password`] on the blocking pool; Argon2 is deliberately slow.
pub async fn verify_password_blocking(password: String, hash: String) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| AppError::Internal(format!("password check task failed: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("open sesame").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("open sesame", &hash).unwrap());
        assert!(!verify_password("open sesame!", &hash).unwrap());
    }

    #[test]
    fn test_salts_differ() {
        let a = hash_password("same").unwrap();
        let b = hash_password("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_garbage_hash_is_error() {
        assert!(verify_password("pw", "plaintext-in-db").is_err());
    }

    #[tokio::test]
    async fn test_blocking_variant() {
        let hash = hash_password("pw").unwrap();
        assert!(verify_password_blocking("pw".into(), hash.clone()).await.unwrap());
        assert!(!verify_password_blocking("nope".into(), hash).await.unwrap());
    }
}
