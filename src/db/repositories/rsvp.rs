use anyhow::{Context, Result};
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::entities::rsvps;

#[derive(Debug, Clone)]
pub struct Rsvp {
    pub id: i32,
    pub event_id: i32,
    pub user_id: i32,
    pub status: String,
    pub comment: Option<String>,
    pub created_at: String,
}

impl From<rsvps::Model> for Rsvp {
    fn from(model: rsvps::Model) -> Self {
        Self {
            id: model.id,
            event_id: model.event_id,
            user_id: model.user_id,
            status: model.status,
            comment: model.comment,
            created_at: model.created_at,
        }
    }
}

pub struct RsvpRepository {
    conn: DatabaseConnection,
}

impl RsvpRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Insert-or-update keyed on UNIQUE(event_id, user_id): a repeat
    /// submission overwrites status and comment, last write wins, and two
    /// concurrent submissions never raise a duplicate-key error.
    pub async fn upsert(
        &self,
        event_id: i32,
        user_id: i32,
        status: &str,
        comment: Option<&str>,
    ) -> Result<Rsvp> {
        let active = rsvps::ActiveModel {
            event_id: Set(event_id),
            user_id: Set(user_id),
            status: Set(status.to_string()),
            comment: Set(comment.map(ToString::to_string)),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };

        rsvps::Entity::insert(active)
            .on_conflict(
                OnConflict::columns([rsvps::Column::EventId, rsvps::Column::UserId])
                    .update_columns([rsvps::Column::Status, rsvps::Column::Comment])
                    .to_owned(),
            )
            .exec(&self.conn)
            .await
            .context("Failed to upsert RSVP")?;

        // Re-read instead of trusting last_insert_id, which the upsert path
        // does not populate reliably on SQLite.
        let row = self
            .find(event_id, user_id)
            .await?
            .context("RSVP missing immediately after upsert")?;

        Ok(row)
    }

    pub async fn find(&self, event_id: i32, user_id: i32) -> Result<Option<Rsvp>> {
        let row = rsvps::Entity::find()
            .filter(rsvps::Column::EventId.eq(event_id))
            .filter(rsvps::Column::UserId.eq(user_id))
            .one(&self.conn)
            .await
            .context("Failed to query RSVP")?;

        Ok(row.map(Rsvp::from))
    }
}
