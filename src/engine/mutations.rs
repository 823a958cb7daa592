use chrono::NaiveDate;
use tokio::sync::oneshot;
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::conflict::{check_no_conflict, now_utc, validate_slot};
use super::{Engine, EngineError, WalCommand};

impl Engine {
    /// Validate, conflict-check and persist a new reservation.
    ///
    /// The conflict scan and the insert run under the same per-date write
    /// lock, so two concurrent creators cannot both pass the scan.
    pub async fn create_reservation(
        &self,
        name: String,
        dept: Option<String>,
        date: NaiveDate,
        slot: Slot,
    ) -> Result<Reservation, EngineError> {
        if name.trim().is_empty() {
            return Err(EngineError::MissingField("name"));
        }
        validate_slot(&slot)?;
        if name.len() > MAX_NAME_LEN {
            return Err(EngineError::LimitExceeded("name too long"));
        }
        if let Some(ref d) = dept
            && d.len() > MAX_DEPT_LEN {
                return Err(EngineError::LimitExceeded("department too long"));
            }

        let day = self.day_entry(date);
        let mut guard = day.write().await;
        if guard.reservations.len() >= MAX_RESERVATIONS_PER_DAY {
            return Err(EngineError::LimitExceeded("too many reservations on this date"));
        }

        check_no_conflict(&guard, &slot)?;

        let reservation = Reservation {
            id: Ulid::new(),
            name,
            dept,
            date,
            slot,
            created_at: now_utc(),
        };
        let event = Event::ReservationCreated {
            id: reservation.id,
            name: reservation.name.clone(),
            dept: reservation.dept.clone(),
            date,
            slot,
            created_at: reservation.created_at,
        };
        self.persist_and_apply(&mut guard, &event).await?;
        Ok(reservation)
    }

    pub async fn delete_reservation(&self, id: Ulid) -> Result<(), EngineError> {
        let mut guard = self.resolve_reservation_write(&id).await?;
        // The index lookup and the lock acquisition are not atomic —
        // a concurrent delete may have won. Re-check under the lock.
        if !guard.contains(&id) {
            return Err(EngineError::NotFound(id));
        }
        let event = Event::ReservationDeleted {
            id,
            date: guard.date,
        };
        self.persist_and_apply(&mut guard, &event).await
    }

    /// Compact the WAL by rewriting it with only the events needed to
    /// recreate the current state: one ReservationCreated per live
    /// reservation, dates ascending, starts ascending within a date.
    pub async fn compact_wal(&self) -> Result<(), EngineError> {
        let mut dates: Vec<NaiveDate> = self.days.iter().map(|e| *e.key()).collect();
        dates.sort();

        let mut events = Vec::new();
        for date in dates {
            let Some(day) = self.day(&date) else { continue };
            let guard = day.read().await;
            for r in &guard.reservations {
                events.push(Event::ReservationCreated {
                    id: r.id,
                    name: r.name.clone(),
                    dept: r.dept.clone(),
                    date: r.date,
                    slot: r.slot,
                    created_at: r.created_at,
                });
            }
        }

        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Compact { events, response: tx })
            .await
            .map_err(|_| EngineError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::WalError(e.to_string()))
    }

    pub async fn wal_appends_since_compact(&self) -> u64 {
        let (tx, rx) = oneshot::channel();
        if self
            .wal_tx
            .send(WalCommand::AppendsSinceCompact { response: tx })
            .await
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}
