use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Half-open time-of-day interval `[start, end)`, minute precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl Slot {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        debug_assert!(start < end, "Slot start must be before end");
        Self { start, end }
    }

    /// Strict intersection test — slots sharing only an endpoint do not overlap.
    pub fn overlaps(&self, other: &Slot) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// A persisted room reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Ulid,
    pub name: String,
    pub dept: Option<String>,
    pub date: NaiveDate,
    pub slot: Slot,
    pub created_at: NaiveDateTime,
}

/// Every reservation on one calendar date, sorted by `slot.start`.
#[derive(Debug, Clone)]
pub struct DayState {
    pub date: NaiveDate,
    pub reservations: Vec<Reservation>,
}

impl DayState {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            reservations: Vec::new(),
        }
    }

    /// Insert maintaining sort order by slot.start.
    pub fn insert_reservation(&mut self, reservation: Reservation) {
        let pos = self
            .reservations
            .binary_search_by_key(&reservation.slot.start, |r| r.slot.start)
            .unwrap_or_else(|e| e);
        self.reservations.insert(pos, reservation);
    }

    /// Remove a reservation by id.
    pub fn remove_reservation(&mut self, id: Ulid) -> Option<Reservation> {
        if let Some(pos) = self.reservations.iter().position(|r| r.id == id) {
            Some(self.reservations.remove(pos))
        } else {
            None
        }
    }

    pub fn contains(&self, id: &Ulid) -> bool {
        self.reservations.iter().any(|r| r.id == *id)
    }

    /// Reservations whose slot overlaps the query, in ascending start order.
    /// Binary search skips everything starting at or after `query.end`.
    pub fn overlapping(&self, query: &Slot) -> impl Iterator<Item = &Reservation> {
        // Everything at index >= right_bound starts at or after query.end → can't overlap.
        let right_bound = self
            .reservations
            .partition_point(|r| r.slot.start < query.end);
        self.reservations[..right_bound]
            .iter()
            .filter(move |r| r.slot.overlaps(query))
    }
}

/// The event types — flat, no nesting. This is the WAL record format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    ReservationCreated {
        id: Ulid,
        name: String,
        dept: Option<String>,
        date: NaiveDate,
        slot: Slot,
        created_at: NaiveDateTime,
    },
    ReservationDeleted {
        id: Ulid,
        date: NaiveDate,
    },
}

impl Event {
    /// The calendar date whose state this event touches.
    pub fn date(&self) -> NaiveDate {
        match self {
            Event::ReservationCreated { date, .. } | Event::ReservationDeleted { date, .. } => {
                *date
            }
        }
    }
}
