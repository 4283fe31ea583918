use std::sync::Arc;

use anyhow::Context;

use eventhub_auth::{Hs256TokenService, PasswordHasher, TokenService};
use eventhub_infra::{AttendeeStore, EventStore, InMemoryStore, PostgresStore, QueryDeadline, UserStore, db};

use crate::config::ApiConfig;
use crate::middleware::AuthState;

/// Everything a handler needs, shared across requests.
#[derive(Clone)]
pub struct AppServices {
    pub users: Arc<dyn UserStore>,
    pub events: Arc<dyn EventStore>,
    pub attendees: Arc<dyn AttendeeStore>,
    pub tokens: Arc<dyn TokenService>,
    pub passwords: PasswordHasher,
    /// Bound passed to every store call.
    pub deadline: QueryDeadline,
}

impl AppServices {
    pub fn new(
        users: Arc<dyn UserStore>,
        events: Arc<dyn EventStore>,
        attendees: Arc<dyn AttendeeStore>,
        tokens: Arc<dyn TokenService>,
        passwords: PasswordHasher,
    ) -> Self {
        Self {
            users,
            events,
            attendees,
            tokens,
            passwords,
            deadline: QueryDeadline::DEFAULT,
        }
    }

    /// All three stores backed by one in-memory store.
    pub fn in_memory(store: Arc<InMemoryStore>, tokens: Arc<dyn TokenService>, passwords: PasswordHasher) -> Self {
        Self {
            users: store.clone(),
            events: store.clone(),
            attendees: store,
            tokens,
            passwords,
            deadline: QueryDeadline::DEFAULT,
        }
    }

    pub fn with_deadline(mut self, deadline: QueryDeadline) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn auth_state(&self) -> AuthState {
        AuthState {
            tokens: self.tokens.clone(),
            users: self.users.clone(),
            deadline: self.deadline,
        }
    }
}

/// Wire stores and auth from configuration.
///
/// With `DATABASE_URL` set this connects to Postgres and applies the schema;
/// otherwise everything lives in process memory.
pub async fn build_services(config: &ApiConfig) -> anyhow::Result<AppServices> {
    let deadline = QueryDeadline::new(config.query_timeout);
    let tokens: Arc<dyn TokenService> =
        Arc::new(Hs256TokenService::new(config.jwt_secret.as_bytes(), config.token_ttl));
    let passwords = PasswordHasher::new(config.bcrypt_cost);

    match &config.database_url {
        Some(url) => {
            let pool = db::connect(url, config.database_max_connections)
                .await
                .context("failed to connect to postgres")?;
            db::ensure_schema(&pool)
                .await
                .context("failed to apply database schema")?;
            tracing::info!("using postgres store");

            let store = Arc::new(PostgresStore::new(pool));
            Ok(
                AppServices::new(store.clone(), store.clone(), store, tokens, passwords)
                    .with_deadline(deadline),
            )
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory store (data is lost on restart)");
            let store = Arc::new(InMemoryStore::new());
            Ok(AppServices::in_memory(store, tokens, passwords).with_deadline(deadline))
        }
    }
}
