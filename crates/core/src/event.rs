//! Event model (owned resource).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{DomainError, DomainResult, Entity, EventId, UserId};

const MIN_NAME_LEN: usize = 3;
const MIN_DESCRIPTION_LEN: usize = 10;
const MIN_LOCATION_LEN: usize = 3;

/// A persisted event.
///
/// # Invariants
/// - `owner_id` references an existing user and never changes after creation.
/// - `ends_at >= starts_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub owner_id: UserId,
    pub name: String,
    pub description: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub location: String,
}

impl Event {
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.owner_id == user_id
    }
}

impl Entity for Event {
    type Id = EventId;

    fn id(&self) -> EventId {
        self.id
    }
}

/// The owner-editable part of an event; used for both create and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDetails {
    pub name: String,
    pub description: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub location: String,
}

impl EventDetails {
    /// Validate required fields; returns the trimmed details.
    pub fn validate(self) -> DomainResult<Self> {
        let name = required("name", &self.name, MIN_NAME_LEN)?;
        let description = required("description", &self.description, MIN_DESCRIPTION_LEN)?;
        let location = required("location", &self.location, MIN_LOCATION_LEN)?;

        if self.ends_at < self.starts_at {
            return Err(DomainError::validation("ends_at must not be before starts_at"));
        }

        Ok(Self {
            name,
            description,
            starts_at: self.starts_at,
            ends_at: self.ends_at,
            location,
        })
    }

    pub fn into_event(self, id: EventId, owner_id: UserId) -> Event {
        Event {
            id,
            owner_id,
            name: self.name,
            description: self.description,
            starts_at: self.starts_at,
            ends_at: self.ends_at,
            location: self.location,
        }
    }
}

fn required(field: &str, value: &str, min_len: usize) -> DomainResult<String> {
    let value = value.trim();
    if value.chars().count() < min_len {
        return Err(DomainError::validation(format!(
            "{field} must be at least {min_len} characters"
        )));
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn details() -> EventDetails {
        let starts_at = Utc::now();
        EventDetails {
            name: "RustConf".to_string(),
            description: "A conference about Rust".to_string(),
            starts_at,
            ends_at: starts_at + Duration::hours(8),
            location: "Montreal".to_string(),
        }
    }

    #[test]
    fn valid_details_pass() {
        assert!(details().validate().is_ok());
    }

    #[test]
    fn short_fields_are_rejected() {
        let mut d = details();
        d.name = "  ab ".to_string();
        assert!(matches!(d.validate(), Err(DomainError::Validation(_))));

        let mut d = details();
        d.description = "too short".to_string();
        assert!(d.validate().is_err());

        let mut d = details();
        d.location = "".to_string();
        assert!(d.validate().is_err());
    }

    #[test]
    fn inverted_time_window_is_rejected() {
        let mut d = details();
        d.ends_at = d.starts_at - Duration::minutes(1);
        assert!(d.validate().is_err());
    }

    #[test]
    fn zero_length_event_is_allowed() {
        let mut d = details();
        d.ends_at = d.starts_at;
        assert!(d.validate().is_ok());
    }
}
