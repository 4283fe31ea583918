//! Infrastructure layer: relational storage for users, events and attendees.

pub mod db;
pub mod store;

pub use store::{
    AttendeeStore, EventStore, InMemoryStore, PostgresStore, QueryDeadline, StoreError, UserStore,
};
