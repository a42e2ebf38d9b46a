//! Event CRUD and RSVP endpoints.
//!
//! Every handler here sits behind [`super::auth::auth_middleware`], so the
//! caller identity arrives as a [`CurrentSession`] extension. Writes to an
//! event are filtered by id AND creator in the store, and a miss for either
//! reason surfaces as the same 404.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use std::sync::Arc;
use tracing::debug;

use super::AppState;
use super::auth::CurrentSession;
use super::error::ApiError;
use super::types::{
    ApiResponse, CreateEventRequest, EventDetailResponse, EventListItem, EventResponse,
    RsvpRequest, RsvpResponse, UpdateEventRequest,
};
use super::validation;
use crate::db::{EventPatch, NewEvent};

pub async fn list_events(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<CurrentSession>,
) -> Result<Json<ApiResponse<Vec<EventListItem>>>, ApiError> {
    let events = state.store.list_events(session.user_id).await?;

    Ok(Json(ApiResponse::success(
        events.into_iter().map(EventListItem::from).collect(),
    )))
}

pub async fn create_event(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<CurrentSession>,
    Json(payload): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<ApiResponse<EventResponse>>), ApiError> {
    let event = NewEvent {
        title: validation::validate_title(&payload.title)?,
        description: validation::validate_description(payload.description.as_deref())?,
        event_date: validation::validate_event_date(&payload.event_date)?,
        event_time: validation::validate_event_time(&payload.event_time)?,
        location: validation::validate_location(&payload.location)?,
        created_by: session.user_id,
    };

    let event = state.store.create_event(event).await?;
    debug!("User {} created event {}", session.user_id, event.id);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(EventResponse::from(event))),
    ))
}

pub async fn get_event(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<CurrentSession>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<EventDetailResponse>>, ApiError> {
    let detail = state
        .store
        .get_event_with_attendees(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Event not found".to_string()))?;

    Ok(Json(ApiResponse::success(EventDetailResponse::from_detail(
        detail,
        session.user_id,
    ))))
}

pub async fn update_event(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<CurrentSession>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateEventRequest>,
) -> Result<Json<ApiResponse<EventResponse>>, ApiError> {
    if payload.is_empty() {
        return Err(ApiError::validation("No fields to update"));
    }

    let patch = EventPatch {
        title: payload
            .title
            .as_deref()
            .map(validation::validate_title)
            .transpose()?,
        description: payload
            .description
            .as_deref()
            .map(|d| validation::validate_description(Some(d)))
            .transpose()?,
        event_date: payload
            .event_date
            .as_deref()
            .map(validation::validate_event_date)
            .transpose()?,
        event_time: payload
            .event_time
            .as_deref()
            .map(validation::validate_event_time)
            .transpose()?,
        location: payload
            .location
            .as_deref()
            .map(validation::validate_location)
            .transpose()?,
    };

    let event = state
        .store
        .update_event(id, session.user_id, patch)
        .await?
        .ok_or_else(ApiError::event_not_found_or_forbidden)?;

    debug!("User {} updated event {}", session.user_id, event.id);
    Ok(Json(ApiResponse::success(EventResponse::from(event))))
}

pub async fn delete_event(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<CurrentSession>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let deleted = state.store.delete_event(id, session.user_id).await?;
    if !deleted {
        return Err(ApiError::event_not_found_or_forbidden());
    }

    debug!("User {} deleted event {id}", session.user_id);
    Ok(Json(ApiResponse::success(())))
}

pub async fn submit_rsvp(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<CurrentSession>,
    Path(id): Path<i32>,
    Json(payload): Json<RsvpRequest>,
) -> Result<Json<ApiResponse<RsvpResponse>>, ApiError> {
    let status = validation::validate_rsvp_status(&payload.status)?;
    let comment = validation::validate_rsvp_comment(payload.comment.as_deref())?;

    // RSVPs are open to any authenticated user, but only for real events.
    if state.store.get_event(id).await?.is_none() {
        return Err(ApiError::NotFound("Event not found".to_string()));
    }

    let rsvp = state
        .store
        .upsert_rsvp(id, session.user_id, &status, comment.as_deref())
        .await?;

    Ok(Json(ApiResponse::success(RsvpResponse::from(rsvp))))
}
