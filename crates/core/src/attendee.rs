//! Attendee join record: "user U is registered for event E".

use serde::{Deserialize, Serialize};

use crate::{AttendeeId, Entity, EventId, UserId};

/// # Invariants
/// - `(event_id, user_id)` is unique across all attendee records.
/// - Both ids reference existing rows; the record disappears with either parent.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Attendee {
    pub id: AttendeeId,
    pub event_id: EventId,
    pub user_id: UserId,
}

impl Entity for Attendee {
    type Id = AttendeeId;

    fn id(&self) -> AttendeeId {
        self.id
    }
}
