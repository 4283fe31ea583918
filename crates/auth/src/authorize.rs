//! Ownership guard.
//!
//! - No IO
//! - No panics
//! - Pure policy check over an already-resolved identity and entity

use thiserror::Error;

use eventhub_core::{Event, User, UserId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    /// Identity resolved, but it does not own the resource.
    #[error("forbidden: user {user_id} does not own event {event_id}")]
    NotOwner { user_id: UserId, event_id: eventhub_core::EventId },

    /// Identity resolved, but it may only act on its own attendance.
    #[error("forbidden: user {user_id} may not change attendance of user {target}")]
    NotOwnerOrSelf { user_id: UserId, target: UserId },
}

/// Allow iff `identity` owns `event`.
///
/// An anonymous (sentinel) identity never owns anything: event owners always
/// have a real id.
pub fn authorize_owner(identity: &User, event: &Event) -> Result<(), AuthzError> {
    if !identity.is_anonymous() && event.is_owned_by(identity.id) {
        Ok(())
    } else {
        Err(AuthzError::NotOwner {
            user_id: identity.id,
            event_id: event.id,
        })
    }
}

/// Allow attendance changes for `target` on `event` when `identity` owns the
/// event or is `target` itself.
pub fn authorize_attendance(identity: &User, event: &Event, target: UserId) -> Result<(), AuthzError> {
    if !identity.is_anonymous() && identity.id == target {
        return Ok(());
    }
    authorize_owner(identity, event).map_err(|_| AuthzError::NotOwnerOrSelf {
        user_id: identity.id,
        target,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use eventhub_core::EventId;
    use proptest::prelude::*;

    fn user(id: i64) -> User {
        User {
            id: UserId::new(id),
            name: format!("user-{id}"),
            email: format!("user{id}@example.com"),
        }
    }

    fn event_owned_by(owner: i64) -> Event {
        Event {
            id: EventId::new(1),
            owner_id: UserId::new(owner),
            name: "Meetup".to_string(),
            description: "Monthly meetup".to_string(),
            starts_at: Utc::now(),
            ends_at: Utc::now(),
            location: "Berlin".to_string(),
        }
    }

    #[test]
    fn anonymous_identity_is_denied() {
        let event = event_owned_by(1);
        assert!(authorize_owner(&User::default(), &event).is_err());
        assert!(authorize_attendance(&User::default(), &event, UserId::UNSET).is_err());
    }

    #[test]
    fn attendance_allows_owner_and_self_only() {
        let event = event_owned_by(1);
        assert!(authorize_attendance(&user(1), &event, UserId::new(2)).is_ok());
        assert!(authorize_attendance(&user(2), &event, UserId::new(2)).is_ok());
        assert_eq!(
            authorize_attendance(&user(3), &event, UserId::new(2)),
            Err(AuthzError::NotOwnerOrSelf {
                user_id: UserId::new(3),
                target: UserId::new(2)
            })
        );
    }

    proptest! {
        #[test]
        fn owner_guard_allows_iff_ids_match(identity in 1i64..1_000, owner in 1i64..1_000) {
            let decision = authorize_owner(&user(identity), &event_owned_by(owner));
            prop_assert_eq!(decision.is_ok(), identity == owner);
        }
    }
}
