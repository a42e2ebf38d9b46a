use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};

use crate::constants::session::RENEWAL_SKIP_MINUTES;
use crate::entities::sessions;

#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub user_id: i32,
    pub created_at: String,
    pub expires_at: String,
}

impl From<sessions::Model> for Session {
    fn from(model: sessions::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            created_at: model.created_at,
            expires_at: model.expires_at,
        }
    }
}

pub struct SessionRepository {
    conn: DatabaseConnection,
}

impl SessionRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(
        &self,
        session_id: &str,
        user_id: i32,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let active = sessions::ActiveModel {
            id: Set(session_id.to_string()),
            user_id: Set(user_id),
            created_at: Set(Utc::now().to_rfc3339()),
            expires_at: Set(expires_at.to_rfc3339()),
        };

        active
            .insert(&self.conn)
            .await
            .context("Failed to create session")?;

        Ok(())
    }

    /// Look up a session by token, applying sliding expiration.
    ///
    /// An expired row is deleted and treated as absent. A live row has its
    /// expiry extended to `now + lifetime`; the write is skipped when the
    /// session was renewed within the last `RENEWAL_SKIP_MINUTES`, and the
    /// stored expiry never moves backward.
    pub async fn find_by_id(&self, session_id: &str, lifetime: Duration) -> Result<Option<Session>> {
        let session = sessions::Entity::find_by_id(session_id)
            .one(&self.conn)
            .await
            .context("Failed to query session")?;

        let Some(session) = session else {
            return Ok(None);
        };

        let now = Utc::now();
        let expires_at = parse_expiry(&session.expires_at)?;

        if expires_at <= now {
            // Expired is indistinguishable from absent; drop the stale row.
            self.delete(session_id).await?;
            return Ok(None);
        }

        let renewed_expiry = now + lifetime;
        if expires_at >= renewed_expiry - Duration::minutes(RENEWAL_SKIP_MINUTES) {
            // Fresh enough; skip the write.
            return Ok(Some(Session::from(session)));
        }

        let new_expiry = renewed_expiry.max(expires_at);

        let mut active: sessions::ActiveModel = session.into();
        active.expires_at = Set(new_expiry.to_rfc3339());
        let updated = active
            .update(&self.conn)
            .await
            .context("Failed to renew session expiry")?;

        Ok(Some(Session::from(updated)))
    }

    /// Delete a session. Idempotent: deleting a nonexistent token is not an
    /// error.
    pub async fn delete(&self, session_id: &str) -> Result<()> {
        sessions::Entity::delete_by_id(session_id)
            .exec(&self.conn)
            .await
            .context("Failed to delete session")?;

        Ok(())
    }

    /// Remove all sessions whose expiry has passed. Best-effort housekeeping;
    /// callers log failures instead of propagating them.
    pub async fn delete_expired(&self) -> Result<u64> {
        let now = Utc::now().to_rfc3339();

        let result = sessions::Entity::delete_many()
            .filter(sessions::Column::ExpiresAt.lt(now))
            .exec(&self.conn)
            .await
            .context("Failed to delete expired sessions")?;

        Ok(result.rows_affected)
    }

    pub async fn count_for_user(&self, user_id: i32) -> Result<u64> {
        use sea_orm::PaginatorTrait;

        let count = sessions::Entity::find()
            .filter(sessions::Column::UserId.eq(user_id))
            .count(&self.conn)
            .await
            .context("Failed to count sessions")?;

        Ok(count)
    }
}

fn parse_expiry(raw: &str) -> Result<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("Malformed session expiry timestamp: {raw}"))?;
    Ok(parsed.with_timezone(&Utc))
}

/// Generate a session token: 32 bytes from the thread-local CSPRNG, hex
/// encoded (64 chars, 256 bits of entropy).
#[must_use]
pub fn generate_session_id() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();

    bytes.iter().fold(String::with_capacity(64), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_session_id_shape() {
        let id = generate_session_id();
        assert_eq!(id.len(), 64);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_generate_session_id_unique() {
        assert_ne!(generate_session_id(), generate_session_id());
    }

    #[test]
    fn test_parse_expiry_roundtrip() {
        let now = Utc::now();
        let parsed = parse_expiry(&now.to_rfc3339()).unwrap();
        assert_eq!(parsed.timestamp(), now.timestamp());
    }

    #[test]
    fn test_parse_expiry_rejects_garbage() {
        assert!(parse_expiry("not-a-timestamp").is_err());
    }
}
