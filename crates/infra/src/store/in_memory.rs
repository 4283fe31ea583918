//! In-memory store for tests/dev.
//!
//! Mirrors the relational schema: ids are assigned from per-table counters,
//! `users.email` and `attendees(event_id, user_id)` are unique, foreign keys
//! are checked on insert, and deleting an event removes its attendees.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;

use eventhub_core::{
    Attendee, AttendeeId, Credentials, Entity, Event, EventDetails, EventId, NewUser, PasswordHash, User,
    UserId,
};

use super::{AttendeeStore, EventStore, QueryDeadline, StoreError, UserStore};

#[derive(Debug, Clone)]
struct UserRecord {
    user: User,
    password_hash: PasswordHash,
}

impl Entity for UserRecord {
    type Id = UserId;

    fn id(&self) -> UserId {
        self.user.id
    }
}

/// One table: rows keyed by id, plus the id sequence.
#[derive(Debug)]
struct Table<E: Entity> {
    rows: BTreeMap<E::Id, E>,
    last_id: i64,
}

impl<E: Entity> Default for Table<E> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            last_id: 0,
        }
    }
}

impl<E> Table<E>
where
    E: Entity,
    E::Id: From<i64>,
{
    fn next_id(&mut self) -> E::Id {
        self.last_id += 1;
        E::Id::from(self.last_id)
    }

    fn insert(&mut self, row: E) {
        self.rows.insert(row.id(), row);
    }

    fn get(&self, id: E::Id) -> Option<&E> {
        self.rows.get(&id)
    }

    fn contains(&self, id: E::Id) -> bool {
        self.rows.contains_key(&id)
    }

    /// Rows in id order.
    fn iter(&self) -> impl Iterator<Item = &E> {
        self.rows.values()
    }
}

#[derive(Debug, Default)]
struct Tables {
    users: Table<UserRecord>,
    events: Table<Event>,
    attendees: Table<Attendee>,
}

/// In-memory implementation of every store trait.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
    latency: Option<Duration>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every operation by `latency` before it touches the tables
    /// (simulates a slow database).
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    async fn pause(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables
            .read()
            .map_err(|_| StoreError::internal("in-memory store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables
            .write()
            .map_err(|_| StoreError::internal("in-memory store lock poisoned"))
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn create_user(&self, deadline: QueryDeadline, user: NewUser) -> Result<User, StoreError> {
        deadline
            .run("create_user", async {
                self.pause().await;
                let mut tables = self.write()?;
                if tables.users.iter().any(|r| r.user.email == user.email) {
                    return Err(StoreError::constraint("users.email must be unique"));
                }

                let id = tables.users.next_id();
                let record = UserRecord {
                    user: User {
                        id,
                        name: user.name,
                        email: user.email,
                    },
                    password_hash: user.password_hash,
                };
                let created = record.user.clone();
                tables.users.insert(record);
                Ok(created)
            })
            .await
    }

    async fn find_user(&self, deadline: QueryDeadline, id: UserId) -> Result<Option<User>, StoreError> {
        deadline
            .run("find_user", async {
                self.pause().await;
                let tables = self.read()?;
                Ok(tables.users.get(id).map(|r| r.user.clone()))
            })
            .await
    }

    async fn find_credentials_by_email(
        &self,
        deadline: QueryDeadline,
        email: &str,
    ) -> Result<Option<Credentials>, StoreError> {
        deadline
            .run("find_credentials_by_email", async {
                self.pause().await;
                let tables = self.read()?;
                Ok(tables
                    .users
                    .iter()
                    .find(|r| r.user.email == email)
                    .map(|r| Credentials {
                        user: r.user.clone(),
                        password_hash: r.password_hash.clone(),
                    }))
            })
            .await
    }
}

#[async_trait]
impl EventStore for InMemoryStore {
    async fn create_event(
        &self,
        deadline: QueryDeadline,
        owner_id: UserId,
        details: EventDetails,
    ) -> Result<Event, StoreError> {
        deadline
            .run("create_event", async {
                self.pause().await;
                let mut tables = self.write()?;
                if !tables.users.contains(owner_id) {
                    return Err(StoreError::constraint("events.owner_id must reference a user"));
                }

                let id = tables.events.next_id();
                let event = details.into_event(id, owner_id);
                tables.events.insert(event.clone());
                Ok(event)
            })
            .await
    }

    async fn find_event(&self, deadline: QueryDeadline, id: EventId) -> Result<Option<Event>, StoreError> {
        deadline
            .run("find_event", async {
                self.pause().await;
                let tables = self.read()?;
                Ok(tables.events.get(id).cloned())
            })
            .await
    }

    async fn list_events(&self, deadline: QueryDeadline) -> Result<Vec<Event>, StoreError> {
        deadline
            .run("list_events", async {
                self.pause().await;
                let tables = self.read()?;
                Ok(tables.events.iter().cloned().collect())
            })
            .await
    }

    async fn list_events_by_owner(
        &self,
        deadline: QueryDeadline,
        owner_id: UserId,
    ) -> Result<Vec<Event>, StoreError> {
        deadline
            .run("list_events_by_owner", async {
                self.pause().await;
                let tables = self.read()?;
                Ok(tables
                    .events
                    .iter()
                    .filter(|e| e.owner_id == owner_id)
                    .cloned()
                    .collect())
            })
            .await
    }

    async fn update_event(
        &self,
        deadline: QueryDeadline,
        id: EventId,
        owner_id: UserId,
        details: EventDetails,
    ) -> Result<Event, StoreError> {
        deadline
            .run("update_event", async {
                self.pause().await;
                let mut tables = self.write()?;
                match tables.events.rows.get_mut(&id) {
                    Some(event) if event.owner_id == owner_id => {
                        *event = details.into_event(id, owner_id);
                        Ok(event.clone())
                    }
                    _ => Err(StoreError::not_found("event")),
                }
            })
            .await
    }

    async fn delete_event(
        &self,
        deadline: QueryDeadline,
        id: EventId,
        owner_id: UserId,
    ) -> Result<(), StoreError> {
        deadline
            .run("delete_event", async {
                self.pause().await;
                let mut tables = self.write()?;
                match tables.events.get(id) {
                    Some(event) if event.owner_id == owner_id => {}
                    _ => return Err(StoreError::not_found("event")),
                }

                tables.events.rows.remove(&id);
                tables.attendees.rows.retain(|_, a| a.event_id != id);
                Ok(())
            })
            .await
    }
}

#[async_trait]
impl AttendeeStore for InMemoryStore {
    async fn insert_attendee(
        &self,
        deadline: QueryDeadline,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<Attendee, StoreError> {
        deadline
            .run("insert_attendee", async {
                self.pause().await;
                let mut tables = self.write()?;
                if !tables.events.contains(event_id) {
                    return Err(StoreError::constraint("attendees.event_id must reference an event"));
                }
                if !tables.users.contains(user_id) {
                    return Err(StoreError::constraint("attendees.user_id must reference a user"));
                }
                if tables
                    .attendees
                    .iter()
                    .any(|a| a.event_id == event_id && a.user_id == user_id)
                {
                    return Err(StoreError::constraint("attendees(event_id, user_id) must be unique"));
                }

                let id: AttendeeId = tables.attendees.next_id();
                let attendee = Attendee { id, event_id, user_id };
                tables.attendees.insert(attendee);
                Ok(attendee)
            })
            .await
    }

    async fn find_attendee(
        &self,
        deadline: QueryDeadline,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<Option<Attendee>, StoreError> {
        deadline
            .run("find_attendee", async {
                self.pause().await;
                let tables = self.read()?;
                Ok(tables
                    .attendees
                    .iter()
                    .find(|a| a.event_id == event_id && a.user_id == user_id)
                    .copied())
            })
            .await
    }

    async fn list_attendees_by_event(
        &self,
        deadline: QueryDeadline,
        event_id: EventId,
    ) -> Result<Vec<User>, StoreError> {
        deadline
            .run("list_attendees_by_event", async {
                self.pause().await;
                let tables = self.read()?;
                let mut users: Vec<User> = tables
                    .attendees
                    .iter()
                    .filter(|a| a.event_id == event_id)
                    .filter_map(|a| tables.users.get(a.user_id))
                    .map(|r| r.user.clone())
                    .collect();
                users.sort_by_key(|u| u.id);
                Ok(users)
            })
            .await
    }

    async fn list_events_by_attendee(
        &self,
        deadline: QueryDeadline,
        user_id: UserId,
    ) -> Result<Vec<Event>, StoreError> {
        deadline
            .run("list_events_by_attendee", async {
                self.pause().await;
                let tables = self.read()?;
                let mut events: Vec<Event> = tables
                    .attendees
                    .iter()
                    .filter(|a| a.user_id == user_id)
                    .filter_map(|a| tables.events.get(a.event_id))
                    .cloned()
                    .collect();
                events.sort_by_key(|e| e.id);
                Ok(events)
            })
            .await
    }

    async fn delete_attendee(
        &self,
        deadline: QueryDeadline,
        user_id: UserId,
        event_id: EventId,
    ) -> Result<(), StoreError> {
        deadline
            .run("delete_attendee", async {
                self.pause().await;
                let mut tables = self.write()?;
                tables
                    .attendees
                    .rows
                    .retain(|_, a| !(a.event_id == event_id && a.user_id == user_id));
                Ok(())
            })
            .await
    }
}
