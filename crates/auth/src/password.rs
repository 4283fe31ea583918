//! Password hashing (bcrypt).
//!
//! Both operations are CPU-bound; async callers should run them on a blocking
//! thread.

use thiserror::Error;

use eventhub_core::PasswordHash;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PasswordError {
    #[error("password hashing failed: {0}")]
    Hash(String),
}

/// bcrypt's default work factor.
pub const DEFAULT_COST: u32 = bcrypt::DEFAULT_COST;

#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(DEFAULT_COST)
    }
}

impl PasswordHasher {
    /// `cost` is clamped into bcrypt's accepted range (4..=31).
    pub fn new(cost: u32) -> Self {
        Self {
            cost: cost.clamp(4, 31),
        }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    pub fn hash(&self, password: &str) -> Result<PasswordHash, PasswordError> {
        bcrypt::hash(password, self.cost)
            .map(PasswordHash::new)
            .map_err(|e| PasswordError::Hash(e.to_string()))
    }

    /// `Ok(false)` for a wrong password; `Err` only when the stored hash is
    /// unusable.
    pub fn verify(&self, password: &str, hash: &PasswordHash) -> Result<bool, PasswordError> {
        bcrypt::verify(password, hash.as_str()).map_err(|e| PasswordError::Hash(e.to_string()))
    }

    /// Verification against a missing hash: always `Ok(false)`, after one
    /// bcrypt computation at the configured cost, so a lookup miss takes as
    /// long as a wrong password.
    pub fn verify_absent(&self, password: &str) -> Result<bool, PasswordError> {
        self.hash(password)?;
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hasher = PasswordHasher::new(4);
        let hash = hasher.hash("correct horse").unwrap();

        assert_ne!(hash.as_str(), "correct horse");
        assert_eq!(hasher.verify("correct horse", &hash), Ok(true));
        assert_eq!(hasher.verify("battery staple", &hash), Ok(false));
    }

    #[test]
    fn absent_hash_never_matches() {
        let hasher = PasswordHasher::new(4);
        assert_eq!(hasher.verify_absent("correct horse"), Ok(false));
        assert_eq!(hasher.verify_absent(""), Ok(false));
    }

    #[test]
    fn corrupt_hash_is_an_error() {
        let hasher = PasswordHasher::new(4);
        assert!(hasher.verify("x", &PasswordHash::new("not-a-hash")).is_err());
    }

    #[test]
    fn cost_is_clamped() {
        assert_eq!(PasswordHasher::new(1).cost(), 4);
        assert_eq!(PasswordHasher::new(99).cost(), 31);
    }
}
