//! Data access boundary.
//!
//! Three store traits share one error type; every operation takes an explicit
//! [`QueryDeadline`]. Two implementations exist: Postgres (production) and
//! in-memory (tests/dev), with identical uniqueness, foreign-key and cascade
//! semantics.

pub mod deadline;
pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use deadline::QueryDeadline;
pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use r#trait::{AttendeeStore, EventStore, StoreError, UserStore};
