use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::Extensions;
use axum::http::request::Parts;

use eventhub_core::{User, UserId};

/// Identity resolved by the auth middleware for the current request.
///
/// Only inserted after the token validated and its subject was loaded from the
/// credential store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestIdentity {
    user: User,
}

impl RequestIdentity {
    pub fn new(user: User) -> Self {
        Self { user }
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn user_id(&self) -> UserId {
        self.user.id
    }
}

/// The resolved identity, if any.
pub fn current_user(extensions: &Extensions) -> Option<&User> {
    extensions.get::<RequestIdentity>().map(RequestIdentity::user)
}

/// The resolved identity, or the anonymous sentinel (`User::default()`).
///
/// Callers must check `is_anonymous()` before trusting the result.
pub fn user_or_anonymous(extensions: &Extensions) -> User {
    current_user(extensions).cloned().unwrap_or_default()
}

/// Extractor over [`current_user`]. Never rejects.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Option<User>);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(CurrentUser(current_user(&parts.extensions).cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> User {
        User {
            id: UserId::new(7),
            name: "Alice".into(),
            email: "alice@example.com".into(),
        }
    }

    #[test]
    fn absent_identity_is_none_or_anonymous() {
        let ext = Extensions::new();
        assert!(current_user(&ext).is_none());
        assert!(user_or_anonymous(&ext).is_anonymous());
    }

    #[test]
    fn attached_identity_is_returned() {
        let mut ext = Extensions::new();
        ext.insert(RequestIdentity::new(alice()));

        assert_eq!(current_user(&ext), Some(&alice()));
        assert_eq!(user_or_anonymous(&ext).id, UserId::new(7));
    }
}
