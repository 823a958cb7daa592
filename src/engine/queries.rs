use chrono::NaiveDate;

use crate::model::Reservation;

use super::Engine;

impl Engine {
    /// Every reservation on `date`, ascending by start time.
    pub async fn get_slots(&self, date: NaiveDate) -> Vec<Reservation> {
        let Some(day) = self.day(&date) else {
            return Vec::new();
        };
        let guard = day.read().await;
        guard.reservations.clone()
    }

    /// All reservations, optionally bounded by an inclusive date range.
    /// Ordered by date descending, then start time descending.
    pub async fn list_reservations(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Vec<Reservation> {
        // Collect keys first — never hold a DashMap shard across an await.
        let mut dates: Vec<NaiveDate> = self
            .days
            .iter()
            .map(|e| *e.key())
            .filter(|d| from.is_none_or(|f| *d >= f) && to.is_none_or(|t| *d <= t))
            .collect();
        dates.sort_by(|a, b| b.cmp(a));

        let mut out = Vec::new();
        for date in dates {
            let Some(day) = self.day(&date) else { continue };
            let guard = day.read().await;
            // The per-day vec is ascending by start; reverse for start-desc.
            out.extend(guard.reservations.iter().rev().cloned());
        }
        out
    }
}
