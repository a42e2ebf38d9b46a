//! Wire types for the HTTP API.

use serde::{Deserialize, Serialize};

use crate::db::{Attendee, Event, EventDetail, EventWithCounts, Rsvp, RsvpCounts, User};

/// Uniform response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub const fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// -- auth --------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i32,
    pub username: String,
    pub verified: bool,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            verified: user.verified,
        }
    }
}

/// Body for `GET /api/auth/check`. Not wrapped in [`ApiResponse`]: the
/// endpoint answers "is this cookie good" with the same shape on 200 and 401.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionCheckResponse {
    pub valid: bool,
}

// -- events ------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub event_date: String,
    pub event_time: String,
    pub location: String,
}

/// Partial update; omitted fields keep their stored value.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub event_date: Option<String>,
    pub event_time: Option<String>,
    pub location: Option<String>,
}

impl UpdateEventRequest {
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.event_date.is_none()
            && self.event_time.is_none()
            && self.location.is_none()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EventResponse {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub event_date: String,
    pub event_time: String,
    pub location: String,
    pub created_by: i32,
    pub created_at: String,
}

impl From<Event> for EventResponse {
    fn from(event: Event) -> Self {
        Self {
            id: event.id,
            title: event.title,
            description: event.description,
            event_date: event.event_date,
            event_time: event.event_time,
            location: event.location,
            created_by: event.created_by,
            created_at: event.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RsvpCountsResponse {
    pub yes: i64,
    pub no: i64,
    pub maybe: i64,
}

impl From<RsvpCounts> for RsvpCountsResponse {
    fn from(counts: RsvpCounts) -> Self {
        Self {
            yes: counts.yes,
            no: counts.no,
            maybe: counts.maybe,
        }
    }
}

/// List item: event plus creator name, tallies, and the caller's own RSVP.
#[derive(Debug, Serialize, Deserialize)]
pub struct EventListItem {
    #[serde(flatten)]
    pub event: EventResponse,
    pub creator_username: Option<String>,
    pub rsvp_counts: RsvpCountsResponse,
    pub user_rsvp: Option<String>,
}

impl From<EventWithCounts> for EventListItem {
    fn from(row: EventWithCounts) -> Self {
        Self {
            event: EventResponse::from(row.event),
            creator_username: row.creator_username,
            rsvp_counts: RsvpCountsResponse::from(row.counts),
            user_rsvp: row.user_rsvp,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AttendeeResponse {
    pub user_id: i32,
    pub username: Option<String>,
    pub status: String,
    pub comment: Option<String>,
    pub created_at: String,
}

impl From<Attendee> for AttendeeResponse {
    fn from(attendee: Attendee) -> Self {
        Self {
            user_id: attendee.user_id,
            username: attendee.username,
            status: attendee.status,
            comment: attendee.comment,
            created_at: attendee.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EventDetailResponse {
    #[serde(flatten)]
    pub event: EventResponse,
    pub creator_username: Option<String>,
    pub attendees: Vec<AttendeeResponse>,
    pub rsvp_counts: RsvpCountsResponse,
    pub user_rsvp: Option<String>,
    pub is_creator: bool,
}

impl EventDetailResponse {
    pub fn from_detail(detail: EventDetail, viewer_id: i32) -> Self {
        let user_rsvp = detail
            .attendees
            .iter()
            .find(|a| a.user_id == viewer_id)
            .map(|a| a.status.clone());
        let is_creator = detail.event.created_by == viewer_id;

        Self {
            event: EventResponse::from(detail.event),
            creator_username: detail.creator_username,
            attendees: detail.attendees.into_iter().map(Into::into).collect(),
            rsvp_counts: RsvpCountsResponse::from(detail.counts),
            user_rsvp,
            is_creator,
        }
    }
}

// -- rsvps -------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct RsvpRequest {
    pub status: String,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RsvpResponse {
    pub event_id: i32,
    pub status: String,
    pub comment: Option<String>,
}

impl From<Rsvp> for RsvpResponse {
    fn from(rsvp: Rsvp) -> Self {
        Self {
            event_id: rsvp.event_id,
            status: rsvp.status,
            comment: rsvp.comment,
        }
    }
}
