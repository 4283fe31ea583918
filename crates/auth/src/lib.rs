//! `eventhub-auth` — authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: it issues and
//! validates identity tokens, hashes passwords, and answers ownership
//! questions about already-loaded entities.

pub mod authorize;
pub mod claims;
pub mod password;
pub mod token;

pub use authorize::{AuthzError, authorize_attendance, authorize_owner};
pub use claims::{TokenClaims, TokenValidationError, validate_claims};
pub use password::{PasswordError, PasswordHasher};
pub use token::{Hs256TokenService, TokenError, TokenService};
