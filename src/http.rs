use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::json;
use ulid::Ulid;

use crate::engine::{Engine, EngineError};
use crate::model::{Reservation, Slot};
use crate::observability::{self, OP_DELETE, OP_LIST, OP_RESERVE, OP_SLOTS};

pub fn router(engine: Arc<Engine>) -> Router {
    Router::new()
        .route("/api/booking/slots", get(get_slots))
        .route("/api/booking/reserve", post(reserve))
        .route("/api/booking/reservations", get(list_reservations))
        .route("/api/booking/reservations/{id}", delete(delete_reservation))
        .with_state(engine)
}

// ── Request payloads ─────────────────────────────────────

/// Raw reserve body. Every field optional at the wire level; the typed
/// parse below decides what is missing vs malformed.
#[derive(Debug, Deserialize)]
pub struct ReserveRequest {
    pub name: Option<String>,
    pub dept: Option<String>,
    pub date: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SlotsQuery {
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RangeQuery {
    start_date: Option<String>,
    end_date: Option<String>,
}

/// A reserve request that survived validation.
#[derive(Debug)]
pub struct NewReservation {
    pub name: String,
    pub dept: Option<String>,
    pub date: NaiveDate,
    pub slot: Slot,
}

fn parse_date(value: Option<&str>, err: &'static str) -> Result<NaiveDate, EngineError> {
    let raw = value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(EngineError::MalformedInput(err))?;
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| EngineError::MalformedInput(err))
}

fn parse_time(value: Option<&str>, err: &'static str) -> Result<NaiveTime, EngineError> {
    let raw = value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(EngineError::MalformedInput(err))?;
    NaiveTime::parse_from_str(raw, "%H:%M").map_err(|_| EngineError::MalformedInput(err))
}

/// Validation order is contractual: name, then date, then times, then range.
/// First failure wins.
pub fn parse_reserve(req: ReserveRequest) -> Result<NewReservation, EngineError> {
    let name = req.name.as_deref().map(str::trim).unwrap_or_default();
    if name.is_empty() {
        return Err(EngineError::MissingField("name"));
    }
    let dept = req
        .dept
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string);
    let date = parse_date(req.date.as_deref(), "date must be YYYY-MM-DD")?;
    let start = parse_time(req.start.as_deref(), "start must be HH:MM")?;
    let end = parse_time(req.end.as_deref(), "end must be HH:MM")?;
    if start >= end {
        return Err(EngineError::InvalidRange);
    }
    Ok(NewReservation {
        name: name.to_string(),
        dept,
        date,
        slot: Slot::new(start, end),
    })
}

// ── Response shapes ──────────────────────────────────────

/// Slot listing entry — absent dept renders as "".
#[derive(Serialize)]
struct SlotView {
    start: String,
    end: String,
    name: String,
    dept: String,
}

impl From<&Reservation> for SlotView {
    fn from(r: &Reservation) -> Self {
        Self {
            start: r.slot.start.format("%H:%M").to_string(),
            end: r.slot.end.format("%H:%M").to_string(),
            name: r.name.clone(),
            dept: r.dept.clone().unwrap_or_default(),
        }
    }
}

/// Full reservation record as returned by reserve/list.
#[derive(Serialize)]
struct BookingView {
    id: String,
    name: String,
    dept: Option<String>,
    date: String,
    start: String,
    end: String,
    created_at: String,
}

impl From<&Reservation> for BookingView {
    fn from(r: &Reservation) -> Self {
        Self {
            id: r.id.to_string(),
            name: r.name.clone(),
            dept: r.dept.clone(),
            date: r.date.format("%Y-%m-%d").to_string(),
            start: r.slot.start.format("%H:%M").to_string(),
            end: r.slot.end.format("%H:%M").to_string(),
            created_at: r.created_at.format("%Y-%m-%dT%H:%M:%S").to_string(),
        }
    }
}

fn status_for(err: &EngineError) -> StatusCode {
    match err {
        EngineError::MissingField(_)
        | EngineError::MalformedInput(_)
        | EngineError::InvalidRange
        | EngineError::LimitExceeded(_) => StatusCode::BAD_REQUEST,
        EngineError::Conflict { .. } => StatusCode::CONFLICT,
        EngineError::NotFound(_) => StatusCode::NOT_FOUND,
        EngineError::WalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Read endpoints report errors as `{error}`; mutating endpoints wrap them
/// as `{success:false, error}`. Both shapes are part of the contract.
fn plain_error(err: &EngineError) -> Response {
    (status_for(err), Json(json!({ "error": err.to_string() }))).into_response()
}

fn flagged_error(err: &EngineError) -> Response {
    (
        status_for(err),
        Json(json!({ "success": false, "error": err.to_string() })),
    )
        .into_response()
}

fn record(op: &'static str, status: &'static str, started: Instant) {
    metrics::counter!(observability::REQUESTS_TOTAL, "op" => op, "status" => status).increment(1);
    metrics::histogram!(observability::REQUEST_DURATION_SECONDS, "op" => op)
        .record(started.elapsed().as_secs_f64());
}

// ── Handlers ─────────────────────────────────────────────

async fn get_slots(State(engine): State<Arc<Engine>>, Query(q): Query<SlotsQuery>) -> Response {
    let started = Instant::now();
    let date = match parse_date(q.date.as_deref(), "date must be YYYY-MM-DD") {
        Ok(date) => date,
        Err(e) => {
            record(OP_SLOTS, "error", started);
            return plain_error(&e);
        }
    };
    let slots = engine.get_slots(date).await;
    record(OP_SLOTS, "ok", started);
    Json(slots.iter().map(SlotView::from).collect::<Vec<_>>()).into_response()
}

async fn reserve(
    State(engine): State<Arc<Engine>>,
    Json(req): Json<ReserveRequest>,
) -> Response {
    let started = Instant::now();
    let new = match parse_reserve(req) {
        Ok(new) => new,
        Err(e) => {
            record(OP_RESERVE, "error", started);
            return flagged_error(&e);
        }
    };
    match engine
        .create_reservation(new.name, new.dept, new.date, new.slot)
        .await
    {
        Ok(reservation) => {
            record(OP_RESERVE, "ok", started);
            (
                StatusCode::CREATED,
                Json(json!({
                    "success": true,
                    "booking": BookingView::from(&reservation),
                })),
            )
                .into_response()
        }
        Err(e) => {
            record(OP_RESERVE, "error", started);
            flagged_error(&e)
        }
    }
}

async fn list_reservations(
    State(engine): State<Arc<Engine>>,
    Query(q): Query<RangeQuery>,
) -> Response {
    let started = Instant::now();
    let parse_bound = |value: Option<&str>, err| match value {
        None => Ok(None),
        Some(raw) => parse_date(Some(raw), err).map(Some),
    };
    let from = match parse_bound(q.start_date.as_deref(), "start_date must be YYYY-MM-DD") {
        Ok(from) => from,
        Err(e) => {
            record(OP_LIST, "error", started);
            return plain_error(&e);
        }
    };
    let to = match parse_bound(q.end_date.as_deref(), "end_date must be YYYY-MM-DD") {
        Ok(to) => to,
        Err(e) => {
            record(OP_LIST, "error", started);
            return plain_error(&e);
        }
    };
    let reservations = engine.list_reservations(from, to).await;
    record(OP_LIST, "ok", started);
    Json(reservations.iter().map(BookingView::from).collect::<Vec<_>>()).into_response()
}

async fn delete_reservation(
    State(engine): State<Arc<Engine>>,
    Path(id): Path<String>,
) -> Response {
    let started = Instant::now();
    let Ok(id) = Ulid::from_string(&id) else {
        record(OP_DELETE, "error", started);
        return flagged_error(&EngineError::MalformedInput("id must be a ULID"));
    };
    match engine.delete_reservation(id).await {
        Ok(()) => {
            record(OP_DELETE, "ok", started);
            Json(json!({ "success": true })).into_response()
        }
        Err(e) => {
            record(OP_DELETE, "error", started);
            flagged_error(&e)
        }
    }
}
