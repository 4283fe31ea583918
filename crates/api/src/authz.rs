//! API-side authorization checks.
//!
//! Thin adapters over the ownership guard that log denials and return the
//! HTTP error type.

use eventhub_auth::{authorize_attendance, authorize_owner};
use eventhub_core::{Event, User, UserId};

use crate::app::errors::ApiError;

/// The identity must be present and not the anonymous sentinel.
pub fn require_identity(identity: Option<&User>) -> Result<&User, ApiError> {
    match identity {
        Some(user) if !user.is_anonymous() => Ok(user),
        _ => Err(ApiError::Unauthorized),
    }
}

/// Privileged mutation of `event`: owner only.
pub fn require_owner(identity: &User, event: &Event) -> Result<(), ApiError> {
    authorize_owner(identity, event).map_err(|e| {
        tracing::info!(user_id = %identity.id, event_id = %event.id, "ownership check denied");
        ApiError::from(e)
    })
}

/// Attendance change for `target`: event owner, or `target` itself.
pub fn require_attendance_rights(identity: &User, event: &Event, target: UserId) -> Result<(), ApiError> {
    authorize_attendance(identity, event, target).map_err(|e| {
        tracing::info!(user_id = %identity.id, event_id = %event.id, %target, "attendance check denied");
        ApiError::from(e)
    })
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use eventhub_core::EventId;

    use super::*;

    fn user(id: i64) -> User {
        User {
            id: UserId::new(id),
            name: format!("user{id}"),
            email: format!("user{id}@example.com"),
        }
    }

    fn event(owner: i64) -> Event {
        let at = Utc.with_ymd_and_hms(2030, 1, 1, 18, 0, 0).unwrap();
        Event {
            id: EventId::new(1),
            owner_id: UserId::new(owner),
            name: "Meetup".into(),
            description: "Monthly meetup".into(),
            starts_at: at,
            ends_at: at,
            location: "Hall".into(),
        }
    }

    #[test]
    fn anonymous_identity_is_rejected() {
        assert!(matches!(require_identity(None), Err(ApiError::Unauthorized)));
        let anon = User::default();
        assert!(matches!(require_identity(Some(&anon)), Err(ApiError::Unauthorized)));
    }

    #[test]
    fn non_owner_is_forbidden() {
        assert!(require_owner(&user(1), &event(1)).is_ok());
        assert!(matches!(require_owner(&user(2), &event(1)), Err(ApiError::Forbidden(_))));
    }

    #[test]
    fn attendee_may_change_own_attendance() {
        assert!(require_attendance_rights(&user(2), &event(1), UserId::new(2)).is_ok());
        assert!(require_attendance_rights(&user(1), &event(1), UserId::new(2)).is_ok());
        assert!(matches!(
            require_attendance_rights(&user(3), &event(1), UserId::new(2)),
            Err(ApiError::Forbidden(_))
        ));
    }
}
