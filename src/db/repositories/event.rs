use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use std::collections::HashMap;

use crate::entities::{events, rsvps, users};

#[derive(Debug, Clone)]
pub struct Event {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub event_date: String,
    pub event_time: String,
    pub location: String,
    pub created_by: i32,
    pub created_at: String,
}

impl From<events::Model> for Event {
    fn from(model: events::Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            description: model.description,
            event_date: model.event_date,
            event_time: model.event_time,
            location: model.location,
            created_by: model.created_by,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RsvpCounts {
    pub yes: i64,
    pub no: i64,
    pub maybe: i64,
}

/// Event row enriched for the list view: creator name, tallies, and the
/// requesting user's own RSVP status.
#[derive(Debug, Clone)]
pub struct EventWithCounts {
    pub event: Event,
    pub creator_username: Option<String>,
    pub counts: RsvpCounts,
    pub user_rsvp: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Attendee {
    pub user_id: i32,
    pub username: Option<String>,
    pub status: String,
    pub comment: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct EventDetail {
    pub event: Event,
    pub creator_username: Option<String>,
    pub attendees: Vec<Attendee>,
    pub counts: RsvpCounts,
}

/// Partial update; `None` fields keep their stored value.
#[derive(Debug, Clone, Default)]
pub struct EventPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub event_date: Option<String>,
    pub event_time: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewEvent {
    pub title: String,
    pub description: Option<String>,
    pub event_date: String,
    pub event_time: String,
    pub location: String,
    pub created_by: i32,
}

pub struct EventRepository {
    conn: DatabaseConnection,
}

impl EventRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(&self, event: NewEvent) -> Result<Event> {
        let active = events::ActiveModel {
            title: Set(event.title),
            description: Set(event.description),
            event_date: Set(event.event_date),
            event_time: Set(event.event_time),
            location: Set(event.location),
            created_by: Set(event.created_by),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to create event")?;

        Ok(Event::from(model))
    }

    pub async fn get(&self, id: i32) -> Result<Option<Event>> {
        let event = events::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query event")?;

        Ok(event.map(Event::from))
    }

    /// List all events ordered by date/time, with RSVP tallies and the
    /// requesting user's own status.
    pub async fn list_with_counts(&self, user_id: i32) -> Result<Vec<EventWithCounts>> {
        let rows = events::Entity::find()
            .find_also_related(users::Entity)
            .order_by_asc(events::Column::EventDate)
            .order_by_asc(events::Column::EventTime)
            .all(&self.conn)
            .await
            .context("Failed to list events")?;

        let event_ids: Vec<i32> = rows.iter().map(|(e, _)| e.id).collect();

        let all_rsvps = rsvps::Entity::find()
            .filter(rsvps::Column::EventId.is_in(event_ids))
            .all(&self.conn)
            .await
            .context("Failed to load RSVPs for event list")?;

        let mut counts: HashMap<i32, RsvpCounts> = HashMap::new();
        let mut own_status: HashMap<i32, String> = HashMap::new();
        for rsvp in all_rsvps {
            let entry = counts.entry(rsvp.event_id).or_default();
            match rsvp.status.as_str() {
                "yes" => entry.yes += 1,
                "no" => entry.no += 1,
                "maybe" => entry.maybe += 1,
                other => tracing::warn!("Unknown RSVP status in store: {other}"),
            }
            if rsvp.user_id == user_id {
                own_status.insert(rsvp.event_id, rsvp.status);
            }
        }

        Ok(rows
            .into_iter()
            .map(|(event, creator)| EventWithCounts {
                counts: counts.remove(&event.id).unwrap_or_default(),
                user_rsvp: own_status.remove(&event.id),
                creator_username: creator.map(|u| u.username),
                event: Event::from(event),
            })
            .collect())
    }

    pub async fn get_with_attendees(&self, id: i32) -> Result<Option<EventDetail>> {
        let row = events::Entity::find_by_id(id)
            .find_also_related(users::Entity)
            .one(&self.conn)
            .await
            .context("Failed to query event with creator")?;

        let Some((event, creator)) = row else {
            return Ok(None);
        };

        let attendee_rows = rsvps::Entity::find()
            .filter(rsvps::Column::EventId.eq(id))
            .find_also_related(users::Entity)
            .order_by_asc(rsvps::Column::CreatedAt)
            .all(&self.conn)
            .await
            .context("Failed to load event attendees")?;

        let mut counts = RsvpCounts::default();
        let attendees: Vec<Attendee> = attendee_rows
            .into_iter()
            .map(|(rsvp, user)| {
                match rsvp.status.as_str() {
                    "yes" => counts.yes += 1,
                    "no" => counts.no += 1,
                    "maybe" => counts.maybe += 1,
                    _ => {}
                }
                Attendee {
                    user_id: rsvp.user_id,
                    username: user.map(|u| u.username),
                    status: rsvp.status,
                    comment: rsvp.comment,
                    created_at: rsvp.created_at,
                }
            })
            .collect();

        Ok(Some(EventDetail {
            event: Event::from(event),
            creator_username: creator.map(|u| u.username),
            attendees,
            counts,
        }))
    }

    /// Update an event, filtered by id AND creator in the same query so a
    /// missing event and someone else's event produce the same `None`.
    pub async fn update(&self, id: i32, user_id: i32, patch: EventPatch) -> Result<Option<Event>> {
        let event = events::Entity::find()
            .filter(events::Column::Id.eq(id))
            .filter(events::Column::CreatedBy.eq(user_id))
            .one(&self.conn)
            .await
            .context("Failed to query event for update")?;

        let Some(event) = event else {
            return Ok(None);
        };

        let mut active: events::ActiveModel = event.into();
        if let Some(title) = patch.title {
            active.title = Set(title);
        }
        if let Some(description) = patch.description {
            active.description = Set(description);
        }
        if let Some(event_date) = patch.event_date {
            active.event_date = Set(event_date);
        }
        if let Some(event_time) = patch.event_time {
            active.event_time = Set(event_time);
        }
        if let Some(location) = patch.location {
            active.location = Set(location);
        }

        let updated = active
            .update(&self.conn)
            .await
            .context("Failed to update event")?;

        Ok(Some(Event::from(updated)))
    }

    /// Delete an event, filtered by id AND creator. Returns false for both
    /// "no such event" and "not the creator".
    pub async fn delete(&self, id: i32, user_id: i32) -> Result<bool> {
        let result = events::Entity::delete_many()
            .filter(events::Column::Id.eq(id))
            .filter(events::Column::CreatedBy.eq(user_id))
            .exec(&self.conn)
            .await
            .context("Failed to delete event")?;

        Ok(result.rows_affected > 0)
    }
}
