use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration as StdDuration;
use tracing::info;

use crate::config::SecurityConfig;

pub mod migrator;
pub mod repositories;

pub use repositories::event::{
    Attendee, Event, EventDetail, EventPatch, EventWithCounts, NewEvent, RsvpCounts,
};
pub use repositories::rsvp::Rsvp;
pub use repositories::session::{Session, generate_session_id};
pub use repositories::user::{CreateUserOutcome, User};

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(StdDuration::from_secs(10))
            .acquire_timeout(StdDuration::from_secs(10))
            .idle_timeout(StdDuration::from_secs(300))
            .max_lifetime(StdDuration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn session_repo(&self) -> repositories::session::SessionRepository {
        repositories::session::SessionRepository::new(self.conn.clone())
    }

    fn event_repo(&self) -> repositories::event::EventRepository {
        repositories::event::EventRepository::new(self.conn.clone())
    }

    fn rsvp_repo(&self) -> repositories::rsvp::RsvpRepository {
        repositories::rsvp::RsvpRepository::new(self.conn.clone())
    }

    // -- users --------------------------------------------------------------

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.user_repo().get_by_username(username).await
    }

    pub async fn user_exists(&self, username: &str) -> Result<bool> {
        self.user_repo().exists_by_username(username).await
    }

    pub async fn create_user(
        &self,
        username: &str,
        password: &str,
        config: &SecurityConfig,
    ) -> Result<CreateUserOutcome> {
        self.user_repo().create(username, password, config).await
    }

    pub async fn verify_user_password(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<User>> {
        self.user_repo().verify_password(username, password).await
    }

    pub async fn set_user_verified(&self, username: &str, verified: bool) -> Result<bool> {
        self.user_repo().set_verified(username, verified).await
    }

    // -- sessions -----------------------------------------------------------

    pub async fn create_session(
        &self,
        session_id: &str,
        user_id: i32,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        self.session_repo()
            .create(session_id, user_id, expires_at)
            .await
    }

    pub async fn find_session(
        &self,
        session_id: &str,
        lifetime: Duration,
    ) -> Result<Option<Session>> {
        self.session_repo().find_by_id(session_id, lifetime).await
    }

    pub async fn delete_session(&self, session_id: &str) -> Result<()> {
        self.session_repo().delete(session_id).await
    }

    pub async fn delete_expired_sessions(&self) -> Result<u64> {
        self.session_repo().delete_expired().await
    }

    pub async fn count_sessions_for_user(&self, user_id: i32) -> Result<u64> {
        self.session_repo().count_for_user(user_id).await
    }

    // -- events -------------------------------------------------------------

    pub async fn create_event(&self, event: NewEvent) -> Result<Event> {
        self.event_repo().create(event).await
    }

    pub async fn get_event(&self, id: i32) -> Result<Option<Event>> {
        self.event_repo().get(id).await
    }

    pub async fn list_events(&self, user_id: i32) -> Result<Vec<EventWithCounts>> {
        self.event_repo().list_with_counts(user_id).await
    }

    pub async fn get_event_with_attendees(&self, id: i32) -> Result<Option<EventDetail>> {
        self.event_repo().get_with_attendees(id).await
    }

    pub async fn update_event(
        &self,
        id: i32,
        user_id: i32,
        patch: EventPatch,
    ) -> Result<Option<Event>> {
        self.event_repo().update(id, user_id, patch).await
    }

    pub async fn delete_event(&self, id: i32, user_id: i32) -> Result<bool> {
        self.event_repo().delete(id, user_id).await
    }

    // -- rsvps --------------------------------------------------------------

    pub async fn upsert_rsvp(
        &self,
        event_id: i32,
        user_id: i32,
        status: &str,
        comment: Option<&str>,
    ) -> Result<Rsvp> {
        self.rsvp_repo()
            .upsert(event_id, user_id, status, comment)
            .await
    }

}
