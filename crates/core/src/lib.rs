//! `eventhub-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** types (no infrastructure concerns):
//! identifiers, the user/event/attendee models and input validation.

pub mod attendee;
pub mod entity;
pub mod error;
pub mod event;
pub mod id;
pub mod user;

pub use attendee::Attendee;
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use event::{Event, EventDetails};
pub use id::{AttendeeId, EventId, UserId};
pub use user::{Credentials, NewUser, PasswordHash, Registration, User};
