//! Framework-independent request operations.
//!
//! Each function takes the shared services, the resolved identity (if the
//! route is protected) and already-extracted input. Route handlers are thin
//! adapters over these.

use chrono::{DateTime, Utc};

use eventhub_core::user::normalize_email;
use eventhub_core::{Attendee, Event, EventDetails, EventId, NewUser, Registration, User, UserId};
use eventhub_infra::StoreError;

use crate::authz::{require_attendance_rights, require_identity, require_owner};

use super::dto::{LoginRequest, TokenResponse};
use super::errors::ApiError;
use super::services::AppServices;

pub async fn register(services: &AppServices, input: Registration) -> Result<User, ApiError> {
    let input = input.validate()?;

    let hasher = services.passwords;
    let password = input.password;
    let password_hash = tokio::task::spawn_blocking(move || hasher.hash(&password)).await??;

    let user = services
        .users
        .create_user(
            services.deadline,
            NewUser {
                name: input.name,
                email: input.email,
                password_hash,
            },
        )
        .await
        .map_err(|e| match e {
            StoreError::ConstraintViolation(_) => ApiError::conflict("email is already registered"),
            other => other.into(),
        })?;

    tracing::info!(user_id = %user.id, "user registered");
    Ok(user)
}

/// Unknown email and wrong password are indistinguishable to the caller, in
/// both the response and the bcrypt work done.
pub async fn login(services: &AppServices, input: LoginRequest, now: DateTime<Utc>) -> Result<TokenResponse, ApiError> {
    let email = normalize_email(&input.email);
    let credentials = services
        .users
        .find_credentials_by_email(services.deadline, &email)
        .await?;
    let (user, stored_hash) = match credentials {
        Some(credentials) => (Some(credentials.user), Some(credentials.password_hash)),
        None => (None, None),
    };

    let hasher = services.passwords;
    let password = input.password;
    let verified = tokio::task::spawn_blocking(move || match &stored_hash {
        Some(hash) => hasher.verify(&password, hash),
        None => hasher.verify_absent(&password),
    })
    .await??;

    match user {
        Some(user) if verified => {
            let token = services.tokens.issue(user.id, now)?;
            Ok(TokenResponse { token })
        }
        Some(user) => {
            tracing::debug!(user_id = %user.id, "login attempt with wrong password");
            Err(ApiError::InvalidCredentials)
        }
        None => {
            tracing::debug!("login attempt for unknown email");
            Err(ApiError::InvalidCredentials)
        }
    }
}

pub fn whoami(identity: Option<&User>) -> Result<User, ApiError> {
    require_identity(identity).cloned()
}

pub async fn list_events(services: &AppServices) -> Result<Vec<Event>, ApiError> {
    Ok(services.events.list_events(services.deadline).await?)
}

pub async fn get_event(services: &AppServices, id: EventId) -> Result<Event, ApiError> {
    Ok(services.events.get_event(services.deadline, id).await?)
}

/// Events owned by `owner_id`; 404 when the user does not exist.
pub async fn list_events_of_owner(services: &AppServices, owner_id: UserId) -> Result<Vec<Event>, ApiError> {
    services.users.get_user(services.deadline, owner_id).await?;
    Ok(services.events.list_events_by_owner(services.deadline, owner_id).await?)
}

/// Users attending `event_id`; 404 when the event does not exist.
pub async fn list_attendees(services: &AppServices, event_id: EventId) -> Result<Vec<User>, ApiError> {
    services.events.get_event(services.deadline, event_id).await?;
    Ok(services.attendees.list_attendees_by_event(services.deadline, event_id).await?)
}

/// Events `user_id` attends; 404 when the user does not exist.
pub async fn list_events_of_attendee(services: &AppServices, user_id: UserId) -> Result<Vec<Event>, ApiError> {
    services.users.get_user(services.deadline, user_id).await?;
    Ok(services.attendees.list_events_by_attendee(services.deadline, user_id).await?)
}

pub async fn create_event(
    services: &AppServices,
    identity: Option<&User>,
    details: EventDetails,
) -> Result<Event, ApiError> {
    let identity = require_identity(identity)?;
    let details = details.validate()?;

    let event = services.events.create_event(services.deadline, identity.id, details).await?;
    tracing::info!(event_id = %event.id, owner_id = %identity.id, "event created");
    Ok(event)
}

pub async fn update_event(
    services: &AppServices,
    identity: Option<&User>,
    id: EventId,
    details: EventDetails,
) -> Result<Event, ApiError> {
    let identity = require_identity(identity)?;
    let event = services.events.get_event(services.deadline, id).await?;
    require_owner(identity, &event)?;
    let details = details.validate()?;

    // Conditional on owner: a concurrent delete surfaces as NotFound.
    let event = services
        .events
        .update_event(services.deadline, id, identity.id, details)
        .await?;
    tracing::info!(event_id = %event.id, "event updated");
    Ok(event)
}

pub async fn delete_event(services: &AppServices, identity: Option<&User>, id: EventId) -> Result<(), ApiError> {
    let identity = require_identity(identity)?;
    let event = services.events.get_event(services.deadline, id).await?;
    require_owner(identity, &event)?;

    services.events.delete_event(services.deadline, id, identity.id).await?;
    tracing::info!(event_id = %id, "event deleted");
    Ok(())
}

/// Register `user_id` for `event_id`.
///
/// Duplicate registrations are rejected by the store's uniqueness constraint.
pub async fn add_attendee(
    services: &AppServices,
    identity: Option<&User>,
    event_id: EventId,
    user_id: UserId,
) -> Result<Attendee, ApiError> {
    let identity = require_identity(identity)?;
    let event = services.events.get_event(services.deadline, event_id).await?;
    require_attendance_rights(identity, &event, user_id)?;
    services.users.get_user(services.deadline, user_id).await?;

    let attendee = services
        .attendees
        .insert_attendee(services.deadline, event_id, user_id)
        .await
        .map_err(|e| match e {
            StoreError::ConstraintViolation(detail) => {
                tracing::debug!(%detail, %event_id, %user_id, "attendee insert rejected");
                ApiError::conflict("user is already registered for this event")
            }
            other => other.into(),
        })?;

    tracing::info!(%event_id, %user_id, "attendee added");
    Ok(attendee)
}

pub async fn get_attendee(
    services: &AppServices,
    identity: Option<&User>,
    event_id: EventId,
    user_id: UserId,
) -> Result<Attendee, ApiError> {
    require_identity(identity)?;
    Ok(services.attendees.get_attendee(services.deadline, event_id, user_id).await?)
}

/// Idempotent: removing a registration that does not exist succeeds.
pub async fn remove_attendee(
    services: &AppServices,
    identity: Option<&User>,
    event_id: EventId,
    user_id: UserId,
) -> Result<(), ApiError> {
    let identity = require_identity(identity)?;
    let event = services.events.get_event(services.deadline, event_id).await?;
    require_attendance_rights(identity, &event, user_id)?;

    services.attendees.delete_attendee(services.deadline, user_id, event_id).await?;
    tracing::info!(%event_id, %user_id, "attendee removed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, TimeZone};
    use eventhub_auth::{Hs256TokenService, PasswordHasher};
    use eventhub_infra::{InMemoryStore, QueryDeadline};

    use super::*;

    fn services() -> AppServices {
        let tokens = Arc::new(Hs256TokenService::new(b"test-secret", Duration::hours(1)));
        AppServices::in_memory(Arc::new(InMemoryStore::new()), tokens, PasswordHasher::new(4))
    }

    fn registration(name: &str, email: &str) -> Registration {
        Registration {
            name: name.into(),
            email: email.into(),
            password: "password123".into(),
        }
    }

    fn details(name: &str) -> EventDetails {
        let starts_at = Utc.with_ymd_and_hms(2030, 5, 1, 18, 0, 0).unwrap();
        EventDetails {
            name: name.into(),
            description: "An evening of talks".into(),
            starts_at,
            ends_at: starts_at + Duration::hours(3),
            location: "Main hall".into(),
        }
    }

    #[tokio::test]
    async fn register_then_login_issues_token_for_user() {
        let svc = services();
        let user = register(&svc, registration("Alice", " Alice@Example.com ")).await.unwrap();
        assert_eq!(user.email, "alice@example.com");

        let now = Utc::now();
        let res = login(
            &svc,
            LoginRequest {
                email: "ALICE@example.com".into(),
                password: "password123".into(),
            },
            now,
        )
        .await
        .unwrap();

        assert_eq!(svc.tokens.validate(&res.token, now).unwrap(), user.id);
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let svc = services();
        register(&svc, registration("Alice", "alice@example.com")).await.unwrap();
        let err = register(&svc, registration("Alicia", "ALICE@example.com")).await.unwrap_err();
        assert!(matches!(err, ApiError::ConstraintViolation(_)));
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_are_invalid_credentials() {
        let svc = services();
        register(&svc, registration("Alice", "alice@example.com")).await.unwrap();

        let wrong = LoginRequest {
            email: "alice@example.com".into(),
            password: "not-the-password".into(),
        };
        assert!(matches!(login(&svc, wrong, Utc::now()).await, Err(ApiError::InvalidCredentials)));

        let unknown = LoginRequest {
            email: "bob@example.com".into(),
            password: "password123".into(),
        };
        assert!(matches!(login(&svc, unknown, Utc::now()).await, Err(ApiError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn only_owner_may_update_or_delete() {
        let svc = services();
        let alice = register(&svc, registration("Alice", "alice@example.com")).await.unwrap();
        let bob = register(&svc, registration("Bob", "bob@example.com")).await.unwrap();

        let event = create_event(&svc, Some(&alice), details("Rust night")).await.unwrap();
        assert_eq!(event.owner_id, alice.id);

        let err = update_event(&svc, Some(&bob), event.id, details("Hijacked")).await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        let updated = update_event(&svc, Some(&alice), event.id, details("Rust night II")).await.unwrap();
        assert_eq!(updated.name, "Rust night II");

        let err = delete_event(&svc, Some(&bob), event.id).await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
        delete_event(&svc, Some(&alice), event.id).await.unwrap();
        assert!(matches!(get_event(&svc, event.id).await, Err(ApiError::NotFound("event"))));
    }

    #[tokio::test]
    async fn anonymous_identity_cannot_create() {
        let svc = services();
        let anon = User::default();
        let err = create_event(&svc, Some(&anon), details("Rust night")).await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized));
    }

    #[tokio::test]
    async fn invalid_event_details_are_rejected() {
        let svc = services();
        let alice = register(&svc, registration("Alice", "alice@example.com")).await.unwrap();
        let mut bad = details("Rust night");
        bad.ends_at = bad.starts_at - Duration::hours(1);
        assert!(matches!(
            create_event(&svc, Some(&alice), bad).await,
            Err(ApiError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn duplicate_attendee_conflicts_and_is_listed_once() {
        let svc = services();
        let alice = register(&svc, registration("Alice", "alice@example.com")).await.unwrap();
        let bob = register(&svc, registration("Bob", "bob@example.com")).await.unwrap();
        let event = create_event(&svc, Some(&alice), details("Rust night")).await.unwrap();

        add_attendee(&svc, Some(&alice), event.id, bob.id).await.unwrap();
        let err = add_attendee(&svc, Some(&alice), event.id, bob.id).await.unwrap_err();
        assert!(matches!(err, ApiError::ConstraintViolation(_)));

        let attendees = list_attendees(&svc, event.id).await.unwrap();
        assert_eq!(attendees, vec![bob.clone()]);

        let events = list_events_of_attendee(&svc, bob.id).await.unwrap();
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn attendance_changes_require_owner_or_self() {
        let svc = services();
        let alice = register(&svc, registration("Alice", "alice@example.com")).await.unwrap();
        let bob = register(&svc, registration("Bob", "bob@example.com")).await.unwrap();
        let carol = register(&svc, registration("Carol", "carol@example.com")).await.unwrap();
        let event = create_event(&svc, Some(&alice), details("Rust night")).await.unwrap();

        let err = add_attendee(&svc, Some(&carol), event.id, bob.id).await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        add_attendee(&svc, Some(&bob), event.id, bob.id).await.unwrap();
        assert!(get_attendee(&svc, Some(&carol), event.id, bob.id).await.is_ok());

        let err = remove_attendee(&svc, Some(&carol), event.id, bob.id).await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        remove_attendee(&svc, Some(&bob), event.id, bob.id).await.unwrap();
        remove_attendee(&svc, Some(&bob), event.id, bob.id).await.unwrap();
        assert!(matches!(
            get_attendee(&svc, Some(&bob), event.id, bob.id).await,
            Err(ApiError::NotFound("attendee"))
        ));
    }

    #[tokio::test]
    async fn listings_for_missing_parents_are_not_found() {
        let svc = services();
        assert!(matches!(
            list_attendees(&svc, EventId::new(42)).await,
            Err(ApiError::NotFound("event"))
        ));
        assert!(matches!(
            list_events_of_owner(&svc, UserId::new(42)).await,
            Err(ApiError::NotFound("user"))
        ));

        let alice = register(&svc, registration("Alice", "alice@example.com")).await.unwrap();
        assert!(list_events_of_owner(&svc, alice.id).await.unwrap().is_empty());
        assert!(list_events_of_attendee(&svc, alice.id).await.unwrap().is_empty());
        assert!(list_events(&svc).await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_store_surfaces_as_store_timeout() {
        let tokens = Arc::new(Hs256TokenService::new(b"test-secret", Duration::hours(1)));
        let store = Arc::new(InMemoryStore::new().with_latency(std::time::Duration::from_secs(5)));
        let svc = AppServices::in_memory(store, tokens, PasswordHasher::new(4))
            .with_deadline(QueryDeadline::new(std::time::Duration::from_secs(1)));

        let err = list_events(&svc).await.unwrap_err();
        assert!(matches!(err, ApiError::StoreTimeout(_)));
        assert_eq!(err.code(), "unavailable");
    }
}
