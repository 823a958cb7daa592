use super::conflict::check_no_conflict;
use super::*;
use crate::limits::*;
use chrono::NaiveTime;

fn test_wal_path(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join("slotd_test_engine");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    let _ = std::fs::remove_file(&path);
    path
}

fn t(s: &str) -> NaiveTime {
    NaiveTime::parse_from_str(s, "%H:%M").unwrap()
}

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn slot(start: &str, end: &str) -> Slot {
    Slot::new(t(start), t(end))
}

// ── Pure conflict-scan tests ─────────────────────────────

fn day_with(slots: &[(&str, &str, &str)]) -> DayState {
    let mut day = DayState::new(d("2024-05-01"));
    for (name, start, end) in slots {
        day.insert_reservation(Reservation {
            id: Ulid::new(),
            name: (*name).into(),
            dept: None,
            date: d("2024-05-01"),
            slot: slot(start, end),
            created_at: d("2024-05-01").and_hms_opt(8, 0, 0).unwrap(),
        });
    }
    day
}

#[test]
fn scan_empty_day_passes() {
    let day = DayState::new(d("2024-05-01"));
    assert!(check_no_conflict(&day, &slot("09:00", "10:00")).is_ok());
}

#[test]
fn scan_detects_partial_overlap() {
    let day = day_with(&[("Li", "09:00", "10:00")]);
    let err = check_no_conflict(&day, &slot("09:30", "10:30")).unwrap_err();
    match err {
        EngineError::Conflict { name, slot } => {
            assert_eq!(name, "Li");
            assert_eq!(slot, Slot::new(t("09:00"), t("10:00")));
        }
        other => panic!("expected Conflict, got {other:?}"),
    }
}

#[test]
fn scan_detects_containment() {
    let day = day_with(&[("Li", "09:00", "12:00")]);
    assert!(check_no_conflict(&day, &slot("10:00", "11:00")).is_err());
    let day = day_with(&[("Li", "10:00", "11:00")]);
    assert!(check_no_conflict(&day, &slot("09:00", "12:00")).is_err());
}

#[test]
fn scan_detects_identical_slot() {
    let day = day_with(&[("Li", "09:00", "10:00")]);
    assert!(check_no_conflict(&day, &slot("09:00", "10:00")).is_err());
}

#[test]
fn scan_allows_adjacency() {
    let day = day_with(&[("Li", "09:00", "10:00")]);
    assert!(check_no_conflict(&day, &slot("10:00", "11:00")).is_ok());
    assert!(check_no_conflict(&day, &slot("08:00", "09:00")).is_ok());
}

#[test]
fn scan_reports_earliest_start() {
    let day = day_with(&[("Li", "09:00", "10:00"), ("Wang", "11:00", "12:00")]);
    // Overlaps both; the 09:00 reservation must be the one reported.
    let err = check_no_conflict(&day, &slot("08:00", "13:00")).unwrap_err();
    match err {
        EngineError::Conflict { name, slot } => {
            assert_eq!(name, "Li");
            assert_eq!(slot.start, t("09:00"));
        }
        other => panic!("expected Conflict, got {other:?}"),
    }
}

// ── Async engine tests ───────────────────────────────────

#[tokio::test]
async fn create_and_list_slots_sorted() {
    let engine = Engine::new(test_wal_path("create_list.wal")).unwrap();
    let date = d("2024-05-01");

    // Insert out of start order
    engine
        .create_reservation("Wang".into(), None, date, slot("14:00", "15:00"))
        .await
        .unwrap();
    engine
        .create_reservation("Li".into(), None, date, slot("09:00", "10:00"))
        .await
        .unwrap();
    engine
        .create_reservation("Zhao".into(), None, date, slot("11:00", "12:00"))
        .await
        .unwrap();

    let slots = engine.get_slots(date).await;
    let names: Vec<&str> = slots.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Li", "Zhao", "Wang"]);
}

#[tokio::test]
async fn overlap_rejected_and_nothing_added() {
    let engine = Engine::new(test_wal_path("overlap_reject.wal")).unwrap();
    let date = d("2024-05-01");

    engine
        .create_reservation("Li".into(), None, date, slot("09:00", "10:00"))
        .await
        .unwrap();

    let result = engine
        .create_reservation("Wang".into(), None, date, slot("09:30", "10:30"))
        .await;
    match result {
        Err(EngineError::Conflict { ref name, slot }) => {
            assert_eq!(name, "Li");
            assert_eq!(slot, Slot::new(t("09:00"), t("10:00")));
        }
        other => panic!("expected Conflict, got {other:?}"),
    }

    assert_eq!(engine.get_slots(date).await.len(), 1);
}

#[tokio::test]
async fn adjacent_reservation_allowed() {
    let engine = Engine::new(test_wal_path("adjacent.wal")).unwrap();
    let date = d("2024-05-01");

    engine
        .create_reservation("Li".into(), None, date, slot("09:00", "10:00"))
        .await
        .unwrap();
    // Starts exactly where Li's ends — strict inequalities make this legal.
    engine
        .create_reservation("Zhao".into(), None, date, slot("10:00", "11:00"))
        .await
        .unwrap();

    assert_eq!(engine.get_slots(date).await.len(), 2);
}

#[tokio::test]
async fn equal_start_end_rejected() {
    let engine = Engine::new(test_wal_path("equal_range.wal")).unwrap();
    let degenerate = Slot {
        start: t("09:00"),
        end: t("09:00"),
    };
    let result = engine
        .create_reservation("Li".into(), None, d("2024-05-01"), degenerate)
        .await;
    assert!(matches!(result, Err(EngineError::InvalidRange)));
    assert!(engine.get_slots(d("2024-05-01")).await.is_empty());
}

#[tokio::test]
async fn reversed_range_rejected() {
    let engine = Engine::new(test_wal_path("reversed_range.wal")).unwrap();
    let reversed = Slot {
        start: t("10:00"),
        end: t("09:00"),
    };
    let result = engine
        .create_reservation("Li".into(), None, d("2024-05-01"), reversed)
        .await;
    assert!(matches!(result, Err(EngineError::InvalidRange)));
}

#[tokio::test]
async fn blank_name_rejected() {
    let engine = Engine::new(test_wal_path("blank_name.wal")).unwrap();
    for name in ["", "   "] {
        let result = engine
            .create_reservation(name.into(), None, d("2024-05-01"), slot("09:00", "10:00"))
            .await;
        assert!(matches!(result, Err(EngineError::MissingField("name"))));
    }
}

#[tokio::test]
async fn oversized_name_rejected() {
    let engine = Engine::new(test_wal_path("long_name.wal")).unwrap();
    let name = "x".repeat(MAX_NAME_LEN + 1);
    let result = engine
        .create_reservation(name, None, d("2024-05-01"), slot("09:00", "10:00"))
        .await;
    assert!(matches!(result, Err(EngineError::LimitExceeded(_))));
}

#[tokio::test]
async fn same_slot_different_dates_ok() {
    let engine = Engine::new(test_wal_path("cross_date.wal")).unwrap();
    engine
        .create_reservation("Li".into(), None, d("2024-05-01"), slot("09:00", "10:00"))
        .await
        .unwrap();
    // Identical interval, next day — no conflict across dates.
    engine
        .create_reservation("Wang".into(), None, d("2024-05-02"), slot("09:00", "10:00"))
        .await
        .unwrap();

    assert_eq!(engine.get_slots(d("2024-05-01")).await.len(), 1);
    assert_eq!(engine.get_slots(d("2024-05-02")).await.len(), 1);
}

#[tokio::test]
async fn delete_removes_exactly_one() {
    let engine = Engine::new(test_wal_path("delete_one.wal")).unwrap();
    let date = d("2024-05-01");

    let keep = engine
        .create_reservation("Li".into(), None, date, slot("09:00", "10:00"))
        .await
        .unwrap();
    let gone = engine
        .create_reservation("Wang".into(), None, date, slot("11:00", "12:00"))
        .await
        .unwrap();

    engine.delete_reservation(gone.id).await.unwrap();

    let slots = engine.get_slots(date).await;
    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].id, keep.id);

    // The freed interval can be reserved again.
    engine
        .create_reservation("Zhao".into(), None, date, slot("11:00", "12:00"))
        .await
        .unwrap();
}

#[tokio::test]
async fn delete_unknown_not_found() {
    let engine = Engine::new(test_wal_path("delete_unknown.wal")).unwrap();
    let date = d("2024-05-01");
    engine
        .create_reservation("Li".into(), None, date, slot("09:00", "10:00"))
        .await
        .unwrap();

    let result = engine.delete_reservation(Ulid::new()).await;
    assert!(matches!(result, Err(EngineError::NotFound(_))));
    assert_eq!(engine.get_slots(date).await.len(), 1);
}

#[tokio::test]
async fn delete_twice_not_found() {
    let engine = Engine::new(test_wal_path("delete_twice.wal")).unwrap();
    let r = engine
        .create_reservation("Li".into(), None, d("2024-05-01"), slot("09:00", "10:00"))
        .await
        .unwrap();
    engine.delete_reservation(r.id).await.unwrap();
    let result = engine.delete_reservation(r.id).await;
    assert!(matches!(result, Err(EngineError::NotFound(_))));
}

#[tokio::test]
async fn repeated_reads_identical() {
    let engine = Engine::new(test_wal_path("idempotent_reads.wal")).unwrap();
    let date = d("2024-05-01");
    engine
        .create_reservation("Li".into(), Some("Ops".into()), date, slot("09:00", "10:00"))
        .await
        .unwrap();

    let first = engine.get_slots(date).await;
    let second = engine.get_slots(date).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn list_ordered_date_then_start_descending() {
    let engine = Engine::new(test_wal_path("list_order.wal")).unwrap();

    engine
        .create_reservation("a".into(), None, d("2024-05-01"), slot("09:00", "10:00"))
        .await
        .unwrap();
    engine
        .create_reservation("b".into(), None, d("2024-05-02"), slot("09:00", "10:00"))
        .await
        .unwrap();
    engine
        .create_reservation("c".into(), None, d("2024-05-02"), slot("14:00", "15:00"))
        .await
        .unwrap();

    let all = engine.list_reservations(None, None).await;
    let names: Vec<&str> = all.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["c", "b", "a"]);
}

#[tokio::test]
async fn list_range_bounds_inclusive() {
    let engine = Engine::new(test_wal_path("list_range.wal")).unwrap();

    for (name, date) in [
        ("a", "2024-05-01"),
        ("b", "2024-05-02"),
        ("c", "2024-05-03"),
    ] {
        engine
            .create_reservation(name.into(), None, d(date), slot("09:00", "10:00"))
            .await
            .unwrap();
    }

    let mid = engine
        .list_reservations(Some(d("2024-05-02")), Some(d("2024-05-02")))
        .await;
    assert_eq!(mid.len(), 1);
    assert_eq!(mid[0].name, "b");

    let from_only = engine.list_reservations(Some(d("2024-05-02")), None).await;
    assert_eq!(from_only.len(), 2);

    let to_only = engine.list_reservations(None, Some(d("2024-05-02"))).await;
    assert_eq!(to_only.len(), 2);
}

#[tokio::test]
async fn restart_replays_state() {
    let path = test_wal_path("restart.wal");
    let id;
    {
        let engine = Engine::new(path.clone()).unwrap();
        id = engine
            .create_reservation(
                "Li".into(),
                Some("Engineering".into()),
                d("2024-05-01"),
                slot("09:00", "10:00"),
            )
            .await
            .unwrap()
            .id;
    }

    let engine = Engine::new(path).unwrap();
    let slots = engine.get_slots(d("2024-05-01")).await;
    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].id, id);
    assert_eq!(slots[0].dept.as_deref(), Some("Engineering"));

    // The replayed reservation still blocks its interval...
    let result = engine
        .create_reservation("Wang".into(), None, d("2024-05-01"), slot("09:30", "10:30"))
        .await;
    assert!(matches!(result, Err(EngineError::Conflict { .. })));

    // ...and can still be deleted through the rebuilt index.
    engine.delete_reservation(id).await.unwrap();
    assert!(engine.get_slots(d("2024-05-01")).await.is_empty());
}

#[tokio::test]
async fn restart_after_delete_stays_deleted() {
    let path = test_wal_path("restart_delete.wal");
    {
        let engine = Engine::new(path.clone()).unwrap();
        let r = engine
            .create_reservation("Li".into(), None, d("2024-05-01"), slot("09:00", "10:00"))
            .await
            .unwrap();
        engine
            .create_reservation("Wang".into(), None, d("2024-05-01"), slot("11:00", "12:00"))
            .await
            .unwrap();
        engine.delete_reservation(r.id).await.unwrap();
    }

    let engine = Engine::new(path).unwrap();
    let slots = engine.get_slots(d("2024-05-01")).await;
    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].name, "Wang");
}

#[tokio::test]
async fn compact_preserves_state() {
    let path = test_wal_path("compact_state.wal");
    let engine = Engine::new(path.clone()).unwrap();

    engine
        .create_reservation("Li".into(), None, d("2024-05-01"), slot("09:00", "10:00"))
        .await
        .unwrap();
    let churn = engine
        .create_reservation("Wang".into(), None, d("2024-05-01"), slot("11:00", "12:00"))
        .await
        .unwrap();
    engine
        .create_reservation("Zhao".into(), None, d("2024-05-02"), slot("09:00", "10:00"))
        .await
        .unwrap();
    engine.delete_reservation(churn.id).await.unwrap();

    engine.compact_wal().await.unwrap();
    assert_eq!(engine.wal_appends_since_compact().await, 0);

    // A fresh engine replaying the compacted log sees the same live state.
    let reopened = Engine::new(path).unwrap();
    assert_eq!(reopened.get_slots(d("2024-05-01")).await.len(), 1);
    assert_eq!(reopened.get_slots(d("2024-05-02")).await.len(), 1);
    assert_eq!(reopened.list_reservations(None, None).await.len(), 2);
}
