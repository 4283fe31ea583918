//! Postgres-backed store implementation.
//!
//! ## Error Mapping
//!
//! SQLx errors are mapped to `StoreError` as follows:
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database (unique violation) | `23505` | `ConstraintViolation` | Duplicate email / duplicate attendee pair |
//! | Database (foreign key violation) | `23503` | `ConstraintViolation` | Unknown event or user id |
//! | Database (check constraint violation) | `23514` | `ConstraintViolation` | Row rejected by a CHECK |
//! | Database (other) | Any other | `Internal` | |
//! | PoolTimedOut / PoolClosed / Io / other | N/A | `Internal` | Connection problems |
//!
//! Single-row lookups use `fetch_optional`, so "no row" surfaces as `Ok(None)`
//! and never as `sqlx::Error::RowNotFound`.
//!
//! ## Thread Safety
//!
//! `PostgresStore` is `Send + Sync` and cheap to clone; the SQLx pool handles
//! concurrent connection use.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::instrument;

use eventhub_core::{
    Attendee, AttendeeId, Credentials, Event, EventDetails, EventId, NewUser, PasswordHash, User, UserId,
};

use super::{AttendeeStore, EventStore, QueryDeadline, StoreError, UserStore};

const EVENT_COLUMNS: &str = "id, owner_id, name, description, starts_at, ends_at, location";

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: i64,
    name: String,
    email: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: UserId::new(row.id),
            name: row.name,
            email: row.email,
        }
    }
}

#[derive(FromRow)]
struct CredentialsRow {
    id: i64,
    name: String,
    email: String,
    password_hash: String,
}

impl From<CredentialsRow> for Credentials {
    fn from(row: CredentialsRow) -> Self {
        Credentials {
            user: User {
                id: UserId::new(row.id),
                name: row.name,
                email: row.email,
            },
            password_hash: PasswordHash::new(row.password_hash),
        }
    }
}

#[derive(Debug, FromRow)]
struct EventRow {
    id: i64,
    owner_id: i64,
    name: String,
    description: String,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    location: String,
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        Event {
            id: EventId::new(row.id),
            owner_id: UserId::new(row.owner_id),
            name: row.name,
            description: row.description,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            location: row.location,
        }
    }
}

#[derive(Debug, FromRow)]
struct AttendeeRow {
    id: i64,
    event_id: i64,
    user_id: i64,
}

impl From<AttendeeRow> for Attendee {
    fn from(row: AttendeeRow) -> Self {
        Attendee {
            id: AttendeeId::new(row.id),
            event_id: EventId::new(row.event_id),
            user_id: UserId::new(row.user_id),
        }
    }
}

#[async_trait]
impl UserStore for PostgresStore {
    #[instrument(skip(self, user), fields(email = %user.email))]
    async fn create_user(&self, deadline: QueryDeadline, user: NewUser) -> Result<User, StoreError> {
        deadline
            .run("create_user", async {
                let row: UserRow = sqlx::query_as(
                    r#"
                    INSERT INTO users (name, email, password_hash)
                    VALUES ($1, $2, $3)
                    RETURNING id, name, email
                    "#,
                )
                .bind(&user.name)
                .bind(&user.email)
                .bind(user.password_hash.as_str())
                .fetch_one(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("create_user", e))?;
                Ok(row.into())
            })
            .await
    }

    #[instrument(skip(self))]
    async fn find_user(&self, deadline: QueryDeadline, id: UserId) -> Result<Option<User>, StoreError> {
        deadline
            .run("find_user", async {
                let row: Option<UserRow> = sqlx::query_as("SELECT id, name, email FROM users WHERE id = $1")
                    .bind(id.get())
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(|e| map_sqlx_error("find_user", e))?;
                Ok(row.map(User::from))
            })
            .await
    }

    #[instrument(skip(self))]
    async fn find_credentials_by_email(
        &self,
        deadline: QueryDeadline,
        email: &str,
    ) -> Result<Option<Credentials>, StoreError> {
        deadline
            .run("find_credentials_by_email", async {
                let row: Option<CredentialsRow> =
                    sqlx::query_as("SELECT id, name, email, password_hash FROM users WHERE email = $1")
                        .bind(email)
                        .fetch_optional(&self.pool)
                        .await
                        .map_err(|e| map_sqlx_error("find_credentials_by_email", e))?;
                Ok(row.map(Credentials::from))
            })
            .await
    }
}

#[async_trait]
impl EventStore for PostgresStore {
    #[instrument(skip(self, details))]
    async fn create_event(
        &self,
        deadline: QueryDeadline,
        owner_id: UserId,
        details: EventDetails,
    ) -> Result<Event, StoreError> {
        deadline
            .run("create_event", async {
                let sql = format!(
                    "INSERT INTO events (owner_id, name, description, starts_at, ends_at, location) \
                     VALUES ($1, $2, $3, $4, $5, $6) RETURNING {EVENT_COLUMNS}"
                );
                let row: EventRow = sqlx::query_as(&sql)
                    .bind(owner_id.get())
                    .bind(&details.name)
                    .bind(&details.description)
                    .bind(details.starts_at)
                    .bind(details.ends_at)
                    .bind(&details.location)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(|e| map_sqlx_error("create_event", e))?;
                Ok(row.into())
            })
            .await
    }

    #[instrument(skip(self))]
    async fn find_event(&self, deadline: QueryDeadline, id: EventId) -> Result<Option<Event>, StoreError> {
        deadline
            .run("find_event", async {
                let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1");
                let row: Option<EventRow> = sqlx::query_as(&sql)
                    .bind(id.get())
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(|e| map_sqlx_error("find_event", e))?;
                Ok(row.map(Event::from))
            })
            .await
    }

    #[instrument(skip(self))]
    async fn list_events(&self, deadline: QueryDeadline) -> Result<Vec<Event>, StoreError> {
        deadline
            .run("list_events", async {
                let sql = format!("SELECT {EVENT_COLUMNS} FROM events ORDER BY id ASC");
                let rows: Vec<EventRow> = sqlx::query_as(&sql)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(|e| map_sqlx_error("list_events", e))?;
                Ok(rows.into_iter().map(Event::from).collect())
            })
            .await
    }

    #[instrument(skip(self))]
    async fn list_events_by_owner(
        &self,
        deadline: QueryDeadline,
        owner_id: UserId,
    ) -> Result<Vec<Event>, StoreError> {
        deadline
            .run("list_events_by_owner", async {
                let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE owner_id = $1 ORDER BY id ASC");
                let rows: Vec<EventRow> = sqlx::query_as(&sql)
                    .bind(owner_id.get())
                    .fetch_all(&self.pool)
                    .await
                    .map_err(|e| map_sqlx_error("list_events_by_owner", e))?;
                Ok(rows.into_iter().map(Event::from).collect())
            })
            .await
    }

    #[instrument(skip(self, details))]
    async fn update_event(
        &self,
        deadline: QueryDeadline,
        id: EventId,
        owner_id: UserId,
        details: EventDetails,
    ) -> Result<Event, StoreError> {
        deadline
            .run("update_event", async {
                let sql = format!(
                    "UPDATE events \
                     SET name = $3, description = $4, starts_at = $5, ends_at = $6, location = $7 \
                     WHERE id = $1 AND owner_id = $2 \
                     RETURNING {EVENT_COLUMNS}"
                );
                let row: Option<EventRow> = sqlx::query_as(&sql)
                    .bind(id.get())
                    .bind(owner_id.get())
                    .bind(&details.name)
                    .bind(&details.description)
                    .bind(details.starts_at)
                    .bind(details.ends_at)
                    .bind(&details.location)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(|e| map_sqlx_error("update_event", e))?;
                row.map(Event::from).ok_or(StoreError::not_found("event"))
            })
            .await
    }

    #[instrument(skip(self))]
    async fn delete_event(
        &self,
        deadline: QueryDeadline,
        id: EventId,
        owner_id: UserId,
    ) -> Result<(), StoreError> {
        deadline
            .run("delete_event", async {
                let result = sqlx::query("DELETE FROM events WHERE id = $1 AND owner_id = $2")
                    .bind(id.get())
                    .bind(owner_id.get())
                    .execute(&self.pool)
                    .await
                    .map_err(|e| map_sqlx_error("delete_event", e))?;
                if result.rows_affected() == 0 {
                    return Err(StoreError::not_found("event"));
                }
                Ok(())
            })
            .await
    }
}

#[async_trait]
impl AttendeeStore for PostgresStore {
    #[instrument(skip(self))]
    async fn insert_attendee(
        &self,
        deadline: QueryDeadline,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<Attendee, StoreError> {
        deadline
            .run("insert_attendee", async {
                let row: AttendeeRow = sqlx::query_as(
                    r#"
                    INSERT INTO attendees (event_id, user_id)
                    VALUES ($1, $2)
                    RETURNING id, event_id, user_id
                    "#,
                )
                .bind(event_id.get())
                .bind(user_id.get())
                .fetch_one(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("insert_attendee", e))?;
                Ok(row.into())
            })
            .await
    }

    #[instrument(skip(self))]
    async fn find_attendee(
        &self,
        deadline: QueryDeadline,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<Option<Attendee>, StoreError> {
        deadline
            .run("find_attendee", async {
                let row: Option<AttendeeRow> = sqlx::query_as(
                    "SELECT id, event_id, user_id FROM attendees WHERE event_id = $1 AND user_id = $2",
                )
                .bind(event_id.get())
                .bind(user_id.get())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("find_attendee", e))?;
                Ok(row.map(Attendee::from))
            })
            .await
    }

    #[instrument(skip(self))]
    async fn list_attendees_by_event(
        &self,
        deadline: QueryDeadline,
        event_id: EventId,
    ) -> Result<Vec<User>, StoreError> {
        deadline
            .run("list_attendees_by_event", async {
                let rows: Vec<UserRow> = sqlx::query_as(
                    r#"
                    SELECT u.id, u.name, u.email
                    FROM users u
                    JOIN attendees a ON u.id = a.user_id
                    WHERE a.event_id = $1
                    ORDER BY u.id ASC
                    "#,
                )
                .bind(event_id.get())
                .fetch_all(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("list_attendees_by_event", e))?;
                Ok(rows.into_iter().map(User::from).collect())
            })
            .await
    }

    #[instrument(skip(self))]
    async fn list_events_by_attendee(
        &self,
        deadline: QueryDeadline,
        user_id: UserId,
    ) -> Result<Vec<Event>, StoreError> {
        deadline
            .run("list_events_by_attendee", async {
                let rows: Vec<EventRow> = sqlx::query_as(
                    r#"
                    SELECT e.id, e.owner_id, e.name, e.description, e.starts_at, e.ends_at, e.location
                    FROM events e
                    JOIN attendees a ON e.id = a.event_id
                    WHERE a.user_id = $1
                    ORDER BY e.id ASC
                    "#,
                )
                .bind(user_id.get())
                .fetch_all(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("list_events_by_attendee", e))?;
                Ok(rows.into_iter().map(Event::from).collect())
            })
            .await
    }

    #[instrument(skip(self))]
    async fn delete_attendee(
        &self,
        deadline: QueryDeadline,
        user_id: UserId,
        event_id: EventId,
    ) -> Result<(), StoreError> {
        deadline
            .run("delete_attendee", async {
                // Zero rows affected is success.
                sqlx::query("DELETE FROM attendees WHERE user_id = $1 AND event_id = $2")
                    .bind(user_id.get())
                    .bind(event_id.get())
                    .execute(&self.pool)
                    .await
                    .map_err(|e| map_sqlx_error("delete_attendee", e))?;
                Ok(())
            })
            .await
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("{} in {}", db_err.message(), operation);
            match db_err.code().as_deref() {
                // unique, foreign key, check
                Some("23505") | Some("23503") | Some("23514") => StoreError::ConstraintViolation(msg),
                _ => StoreError::Internal(format!("database error: {msg}")),
            }
        }
        sqlx::Error::PoolTimedOut => {
            StoreError::Internal(format!("connection pool timed out in {operation}"))
        }
        sqlx::Error::PoolClosed => StoreError::Internal(format!("connection pool closed in {operation}")),
        _ => StoreError::Internal(format!("sqlx error in {operation}: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration as ChronoDuration;

    use super::*;
    use crate::db;

    const D: QueryDeadline = QueryDeadline::DEFAULT;

    /// Needs a scratch database: `DATABASE_URL=postgres://... cargo test -- --ignored`.
    async fn store() -> PostgresStore {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for postgres tests");
        let pool = db::connect(&url, 2).await.unwrap();
        db::ensure_schema(&pool).await.unwrap();
        PostgresStore::new(pool)
    }

    /// Emails are unique across runs against the same database.
    fn new_user(name: &str) -> NewUser {
        let nonce = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        NewUser {
            name: name.to_string(),
            email: format!("{}-{nonce}@example.com", name.to_lowercase()),
            password_hash: PasswordHash::new("$2b$04$hash"),
        }
    }

    fn details(name: &str) -> EventDetails {
        let starts_at = Utc::now();
        EventDetails {
            name: name.to_string(),
            description: "An event used in tests".to_string(),
            starts_at,
            ends_at: starts_at + ChronoDuration::hours(2),
            location: "Lisbon".to_string(),
        }
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn duplicate_attendee_and_dangling_keys_are_constraint_violations() {
        let store = store().await;
        let owner = store.create_user(D, new_user("Ada")).await.unwrap();
        let guest = store.create_user(D, new_user("Grace")).await.unwrap();
        let event = store.create_event(D, owner.id, details("Launch")).await.unwrap();

        let inserted = store.insert_attendee(D, event.id, guest.id).await.unwrap();
        assert_eq!(store.find_attendee(D, event.id, guest.id).await.unwrap(), Some(inserted));

        let err = store.insert_attendee(D, event.id, guest.id).await.unwrap_err();
        assert!(matches!(err, StoreError::ConstraintViolation(_)), "{err:?}");
        assert_eq!(store.list_attendees_by_event(D, event.id).await.unwrap(), vec![guest.clone()]);

        let err = store.insert_attendee(D, EventId::new(i64::MAX), guest.id).await.unwrap_err();
        assert!(matches!(err, StoreError::ConstraintViolation(_)), "{err:?}");

        store.delete_attendee(D, guest.id, event.id).await.unwrap();
        store.delete_attendee(D, guest.id, event.id).await.unwrap();
        assert_eq!(store.find_attendee(D, event.id, guest.id).await, Ok(None));
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn duplicate_email_is_a_constraint_violation() {
        let store = store().await;
        let user = new_user("Ada");
        store.create_user(D, user.clone()).await.unwrap();
        let err = store.create_user(D, user).await.unwrap_err();
        assert!(matches!(err, StoreError::ConstraintViolation(_)), "{err:?}");
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn writes_are_conditional_on_owner() {
        let store = store().await;
        let owner = store.create_user(D, new_user("Ada")).await.unwrap();
        let other = store.create_user(D, new_user("Grace")).await.unwrap();
        let event = store.create_event(D, owner.id, details("Launch")).await.unwrap();

        let err = store
            .update_event(D, event.id, other.id, details("Hijacked"))
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::not_found("event"));
        assert_eq!(store.get_event(D, event.id).await.unwrap().name, "Launch");

        let updated = store.update_event(D, event.id, owner.id, details("Relaunch")).await.unwrap();
        assert_eq!(updated.name, "Relaunch");

        assert_eq!(store.delete_event(D, event.id, other.id).await, Err(StoreError::not_found("event")));
        store.delete_event(D, event.id, owner.id).await.unwrap();
        assert_eq!(store.find_event(D, event.id).await, Ok(None));
    }
}
