use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use eventhub_core::{Attendee, Credentials, Event, EventDetails, EventId, NewUser, User, UserId};

use super::QueryDeadline;

/// Store operation error.
///
/// Absence is only an error for the `get_*` lookups and for writes that target
/// a specific row; `find_*` lookups report absence as `Ok(None)`.
///
/// ## Error Categories
///
/// - **NotFound**: a row the caller required does not exist
/// - **ConstraintViolation**: uniqueness or referential integrity rejected a write
/// - **Timeout**: the per-operation deadline elapsed
/// - **Internal**: anything else (connection failures, decode errors, poisoned locks)
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("{operation} exceeded its {deadline:?} deadline")]
    Timeout {
        operation: &'static str,
        deadline: Duration,
    },

    #[error("store failure: {0}")]
    Internal(String),
}

impl StoreError {
    pub fn not_found(entity: &'static str) -> Self {
        Self::NotFound { entity }
    }

    pub fn constraint(msg: impl Into<String>) -> Self {
        Self::ConstraintViolation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Credential store: user records including the password hash.
///
/// The hash only leaves this boundary through [`Credentials`], which the login
/// path consumes; every other lookup returns a plain [`User`].
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user. A duplicate email is a `ConstraintViolation`.
    async fn create_user(&self, deadline: QueryDeadline, user: NewUser) -> Result<User, StoreError>;

    async fn find_user(&self, deadline: QueryDeadline, id: UserId) -> Result<Option<User>, StoreError>;

    /// `email` must already be normalized (see `eventhub_core::user::normalize_email`).
    async fn find_credentials_by_email(
        &self,
        deadline: QueryDeadline,
        email: &str,
    ) -> Result<Option<Credentials>, StoreError>;

    async fn get_user(&self, deadline: QueryDeadline, id: UserId) -> Result<User, StoreError> {
        self.find_user(deadline, id)
            .await?
            .ok_or(StoreError::not_found("user"))
    }
}

/// Event store, keyed by event id.
///
/// Writes that target an existing event are conditional on the owner id in the
/// same statement, so a concurrent ownership check cannot be raced.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Insert an event owned by `owner_id`. An unknown owner is a
    /// `ConstraintViolation`.
    async fn create_event(
        &self,
        deadline: QueryDeadline,
        owner_id: UserId,
        details: EventDetails,
    ) -> Result<Event, StoreError>;

    async fn find_event(&self, deadline: QueryDeadline, id: EventId) -> Result<Option<Event>, StoreError>;

    /// All events, ordered by id.
    async fn list_events(&self, deadline: QueryDeadline) -> Result<Vec<Event>, StoreError>;

    /// Events owned by `owner_id`, ordered by id.
    async fn list_events_by_owner(
        &self,
        deadline: QueryDeadline,
        owner_id: UserId,
    ) -> Result<Vec<Event>, StoreError>;

    /// Replace the editable fields of event `id` if it is owned by `owner_id`;
    /// `NotFound` otherwise.
    async fn update_event(
        &self,
        deadline: QueryDeadline,
        id: EventId,
        owner_id: UserId,
        details: EventDetails,
    ) -> Result<Event, StoreError>;

    /// Delete event `id` if it is owned by `owner_id` (attendees cascade);
    /// `NotFound` otherwise.
    async fn delete_event(
        &self,
        deadline: QueryDeadline,
        id: EventId,
        owner_id: UserId,
    ) -> Result<(), StoreError>;

    async fn get_event(&self, deadline: QueryDeadline, id: EventId) -> Result<Event, StoreError> {
        self.find_event(deadline, id)
            .await?
            .ok_or(StoreError::not_found("event"))
    }
}

/// Attendee store: the many-to-many join between users and events.
#[async_trait]
pub trait AttendeeStore: Send + Sync {
    /// Register `user_id` for `event_id`.
    ///
    /// Uniqueness of the pair and both foreign keys are enforced by the store
    /// itself; either failure is a `ConstraintViolation`.
    async fn insert_attendee(
        &self,
        deadline: QueryDeadline,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<Attendee, StoreError>;

    /// The registration for the pair, or `Ok(None)`.
    async fn find_attendee(
        &self,
        deadline: QueryDeadline,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<Option<Attendee>, StoreError>;

    /// Users registered for `event_id`, ordered by user id. Empty if none.
    async fn list_attendees_by_event(
        &self,
        deadline: QueryDeadline,
        event_id: EventId,
    ) -> Result<Vec<User>, StoreError>;

    /// Events `user_id` is registered for, ordered by event id. Empty if none.
    async fn list_events_by_attendee(
        &self,
        deadline: QueryDeadline,
        user_id: UserId,
    ) -> Result<Vec<Event>, StoreError>;

    /// Remove the registration. Removing a pair that does not exist succeeds.
    async fn delete_attendee(
        &self,
        deadline: QueryDeadline,
        user_id: UserId,
        event_id: EventId,
    ) -> Result<(), StoreError>;

    async fn get_attendee(
        &self,
        deadline: QueryDeadline,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<Attendee, StoreError> {
        self.find_attendee(deadline, event_id, user_id)
            .await?
            .ok_or(StoreError::not_found("attendee"))
    }
}
