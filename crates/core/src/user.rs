//! User identity model.
//!
//! The password hash is carried in its own type so that it never ends up in a
//! response body or a log line: [`PasswordHash`] has no `Serialize` impl and a
//! redacted `Debug`.

use serde::{Deserialize, Serialize};

use crate::{DomainError, DomainResult, Entity, UserId};

const MIN_NAME_LEN: usize = 1;
const MIN_PASSWORD_LEN: usize = 8;

/// A registered user, as visible outside the credential store.
///
/// `User::default()` is the anonymous sentinel: its id is unset. Code that
/// receives a possibly-defaulted user must check [`User::is_anonymous`] before
/// trusting it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

impl User {
    pub fn is_anonymous(&self) -> bool {
        self.id.is_unset()
    }
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> UserId {
        self.id
    }
}

/// Opaque password hash (bcrypt modular crypt string).
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("PasswordHash(<redacted>)")
    }
}

/// A user record with its stored hash; only handed to the login verifier.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user: User,
    pub password_hash: PasswordHash,
}

/// Insert payload for the credential store (password already hashed).
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: PasswordHash,
}

/// Registration input as submitted by a client.
#[derive(Clone, Deserialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl core::fmt::Debug for Registration {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Registration")
            .field("name", &self.name)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

impl Registration {
    /// Validate and normalize (trimmed name, trimmed lower-case email).
    pub fn validate(self) -> DomainResult<Self> {
        let name = self.name.trim().to_string();
        if name.chars().count() < MIN_NAME_LEN {
            return Err(DomainError::validation("name must not be empty"));
        }

        let email = normalize_email(&self.email);
        if !is_plausible_email(&email) {
            return Err(DomainError::validation("email is not a valid address"));
        }

        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(DomainError::validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        Ok(Self {
            name,
            email,
            password: self.password,
        })
    }
}

/// Emails are compared case-insensitively; store them lower-cased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !domain.contains('@') && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}
