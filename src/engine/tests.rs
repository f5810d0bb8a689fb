use super::*;
use crate::store::Review;
use chrono::Utc;

fn test_wal_path(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join("chairtime_test_engine");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    let _ = std::fs::remove_file(&path);
    path
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn t(label: &str) -> SlotTime {
    label.parse().unwrap()
}

fn appointment(on: NaiveDate, slot: &str, phone: &str) -> Appointment {
    Appointment {
        id: Ulid::new(),
        customer_name: "Ayse".into(),
        customer_phone: phone.into(),
        date: on,
        time_slot: t(slot),
        service_id: Ulid::new(),
        status: AppointmentStatus::Pending,
        total_price: 20_000,
        notes: None,
        booked_by: None,
        reviewed_by: None,
        reviewed_at: None,
        created_at: Utc::now(),
    }
}

fn review(id: Ulid, expected: AppointmentStatus, status: AppointmentStatus) -> Review {
    Review {
        id,
        expected,
        status,
        reviewed_by: "admin-1".into(),
        reviewed_at: Utc::now(),
    }
}

fn service(name: &str, order: i32) -> Service {
    Service {
        id: Ulid::new(),
        name: name.into(),
        description: None,
        price: 10_000,
        duration_minutes: 30,
        is_active: true,
        display_order: order,
        created_at: Utc::now(),
    }
}

// ── Ledger ───────────────────────────────────────────────

#[test]
fn ledger_keeps_slot_order() {
    let d = date(2026, 10, 20);
    let mut ledger = DayLedger::new(d);
    for slot in ["11:00", "09:00", "10:30", "09:00"] {
        ledger.insert(appointment(d, slot, "1"));
    }
    let slots: Vec<String> = ledger
        .appointments
        .iter()
        .map(|a| a.time_slot.to_string())
        .collect();
    assert_eq!(slots, ["09:00", "09:00", "10:30", "11:00"]);
    assert_eq!(ledger.at(t("09:00")).len(), 2);
    assert!(ledger.at(t("09:30")).is_empty());
}

#[test]
fn ledger_holder_ignores_rejected() {
    let d = date(2026, 10, 20);
    let mut ledger = DayLedger::new(d);
    let mut rejected = appointment(d, "10:00", "1");
    rejected.status = AppointmentStatus::Rejected;
    ledger.insert(rejected);
    assert!(ledger.holder(t("10:00")).is_none());
    assert!(conflict::check_slot_vacant(&ledger, t("10:00")).is_ok());

    let pending = appointment(d, "10:00", "2");
    let pending_id = pending.id;
    ledger.insert(pending);
    assert_eq!(ledger.holder(t("10:00")).map(|a| a.id), Some(pending_id));
}

// ── Booking ──────────────────────────────────────────────

#[tokio::test]
async fn book_then_same_slot_conflicts() {
    let engine = Engine::new(test_wal_path("book_conflict.wal")).unwrap();
    let d = date(2026, 10, 20);

    let first = engine.book_appointment(appointment(d, "10:00", "1")).await.unwrap();
    let err = engine
        .book_appointment(appointment(d, "10:00", "2"))
        .await
        .unwrap_err();
    match err {
        EngineError::SlotTaken { date, time, holder } => {
            assert_eq!(date, d);
            assert_eq!(time, t("10:00"));
            assert_eq!(holder, first.id);
        }
        other => panic!("expected SlotTaken, got {other:?}"),
    }

    // Neighbouring slot and the same slot on another day stay free.
    engine.book_appointment(appointment(d, "10:30", "3")).await.unwrap();
    engine
        .book_appointment(appointment(date(2026, 10, 21), "10:00", "4"))
        .await
        .unwrap();
    assert_eq!(engine.appointments_on(&d).await.len(), 2);
}

#[tokio::test]
async fn duplicate_id_rejected() {
    let engine = Engine::new(test_wal_path("book_dup_id.wal")).unwrap();
    let a = appointment(date(2026, 10, 20), "10:00", "1");
    engine.book_appointment(a.clone()).await.unwrap();
    let mut again = a.clone();
    again.time_slot = t("11:00");
    assert!(matches!(
        engine.book_appointment(again).await,
        Err(EngineError::AlreadyExists(id)) if id == a.id
    ));
}

#[tokio::test]
async fn rejected_appointment_releases_slot() {
    let engine = Engine::new(test_wal_path("reject_releases.wal")).unwrap();
    let d = date(2026, 10, 20);
    let first = engine.book_appointment(appointment(d, "15:00", "1")).await.unwrap();

    let reviewed = engine
        .review_appointment(review(first.id, AppointmentStatus::Pending, AppointmentStatus::Rejected))
        .await
        .unwrap();
    assert_eq!(reviewed.status, AppointmentStatus::Rejected);
    assert_eq!(reviewed.reviewed_by.as_deref(), Some("admin-1"));
    assert!(reviewed.reviewed_at.is_some());

    let second = engine.book_appointment(appointment(d, "15:00", "2")).await.unwrap();
    let on_day = engine.appointments_on(&d).await;
    assert_eq!(on_day.len(), 2);
    let holders: Vec<_> = on_day.iter().filter(|a| a.holds_slot()).map(|a| a.id).collect();
    assert_eq!(holders, vec![second.id]);
}

#[tokio::test]
async fn review_is_compare_and_swap() {
    let engine = Engine::new(test_wal_path("review_cas.wal")).unwrap();
    let a = engine
        .book_appointment(appointment(date(2026, 10, 20), "09:00", "1"))
        .await
        .unwrap();

    engine
        .review_appointment(review(a.id, AppointmentStatus::Pending, AppointmentStatus::Approved))
        .await
        .unwrap();

    // A second reviewer who still believes it is pending loses.
    let err = engine
        .review_appointment(review(a.id, AppointmentStatus::Pending, AppointmentStatus::Rejected))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::StatusMismatch { current: AppointmentStatus::Approved, .. }
    ));
    assert_eq!(
        engine.appointment(&a.id).await.unwrap().status,
        AppointmentStatus::Approved
    );
}

#[tokio::test]
async fn review_unknown_is_not_found() {
    let engine = Engine::new(test_wal_path("review_missing.wal")).unwrap();
    let id = Ulid::new();
    assert!(matches!(
        engine
            .review_appointment(review(id, AppointmentStatus::Pending, AppointmentStatus::Approved))
            .await,
        Err(EngineError::NotFound(missing)) if missing == id
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_bookings_for_one_slot_yield_one_winner() {
    let engine = Arc::new(Engine::new(test_wal_path("concurrent_slot.wal")).unwrap());
    let d = date(2026, 11, 2);

    let n = 32;
    let mut handles = Vec::new();
    for i in 0..n {
        let eng = engine.clone();
        handles.push(tokio::spawn(async move {
            eng.book_appointment(appointment(d, "14:00", &format!("{i}"))).await
        }));
    }

    let mut won = 0;
    let mut taken = 0;
    for h in handles {
        match h.await.unwrap() {
            Ok(_) => won += 1,
            Err(EngineError::SlotTaken { .. }) => taken += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!(won, 1);
    assert_eq!(taken, n - 1);
    assert_eq!(engine.appointments_on(&d).await.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_bookings_for_distinct_slots_all_succeed() {
    let engine = Arc::new(Engine::new(test_wal_path("concurrent_distinct.wal")).unwrap());
    let d = date(2026, 11, 3);
    let slots: Vec<SlotTime> = WorkingHours::fallback(2).slots();

    let futures = slots.iter().map(|slot| {
        let eng = engine.clone();
        let slot = slot.to_string();
        async move { eng.book_appointment(appointment(d, &slot, "1")).await }
    });
    let results = futures::future::join_all(futures).await;
    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(engine.appointments_on(&d).await.len(), slots.len());
}

// ── Configuration ────────────────────────────────────────

#[tokio::test]
async fn working_hours_upsert_by_weekday() {
    let engine = Engine::new(test_wal_path("hours_upsert.wal")).unwrap();
    assert!(engine.working_hours(3).is_none());

    let mut wh = WorkingHours::fallback(3);
    engine.put_working_hours(wh.clone()).await.unwrap();
    wh.slot_interval = 45;
    engine.put_working_hours(wh.clone()).await.unwrap();

    assert_eq!(engine.working_hours(3), Some(wh));
    assert_eq!(engine.list_working_hours().len(), 1);
}

#[tokio::test]
async fn closing_a_date_twice_writes_once() {
    let engine = Engine::new(test_wal_path("close_twice.wal")).unwrap();
    let d = date(2026, 12, 31);

    engine.set_date_closed(d, true).await.unwrap();
    engine.set_date_closed(d, true).await.unwrap();
    assert_eq!(engine.wal_appends_since_compact().await, 1);
    assert!(engine.is_date_closed(&d));

    engine.set_date_closed(d, false).await.unwrap();
    assert!(!engine.is_date_closed(&d));
    assert!(engine.closed_dates().is_empty());
}

#[tokio::test]
async fn services_sorted_by_order_then_name() {
    let engine = Engine::new(test_wal_path("services_sorted.wal")).unwrap();
    for (name, order) in [("Shave", 2), ("Beard", 1), ("Trim", 1), ("Colour", 0)] {
        engine.save_service(service(name, order)).await.unwrap();
    }
    let names: Vec<String> = engine.list_services().into_iter().map(|s| s.name).collect();
    assert_eq!(names, ["Colour", "Beard", "Trim", "Shave"]);
}

// ── Queries ──────────────────────────────────────────────

#[tokio::test]
async fn find_appointments_orders_and_filters() {
    let engine = Engine::new(test_wal_path("find_filter.wal")).unwrap();
    let (d1, d2, d3) = (date(2026, 10, 20), date(2026, 10, 21), date(2026, 10, 25));

    engine.book_appointment(appointment(d2, "09:00", "555")).await.unwrap();
    engine.book_appointment(appointment(d1, "16:00", "555")).await.unwrap();
    let approved = engine.book_appointment(appointment(d1, "10:00", "777")).await.unwrap();
    engine.book_appointment(appointment(d3, "12:00", "555")).await.unwrap();
    engine
        .review_appointment(review(approved.id, AppointmentStatus::Pending, AppointmentStatus::Approved))
        .await
        .unwrap();

    let all = engine.find_appointments(&AppointmentFilter::default()).await;
    let keys: Vec<(NaiveDate, String)> = all.iter().map(|a| (a.date, a.time_slot.to_string())).collect();
    assert_eq!(
        keys,
        vec![
            (d1, "10:00".to_string()),
            (d1, "16:00".to_string()),
            (d2, "09:00".to_string()),
            (d3, "12:00".to_string()),
        ]
    );

    let by_phone = engine
        .find_appointments(&AppointmentFilter {
            phone: Some("555".into()),
            range: Some((d1, d2)),
            ..Default::default()
        })
        .await;
    assert_eq!(by_phone.len(), 2);

    let approved_only = engine
        .find_appointments(&AppointmentFilter {
            status: Some(AppointmentStatus::Approved),
            ..Default::default()
        })
        .await;
    assert_eq!(approved_only.len(), 1);
    assert_eq!(approved_only[0].id, approved.id);

    let on_d3 = engine
        .find_appointments(&AppointmentFilter {
            date: Some(d3),
            ..Default::default()
        })
        .await;
    assert_eq!(on_d3.len(), 1);
}

// ── Durability ───────────────────────────────────────────

#[tokio::test]
async fn state_survives_restart() {
    let path = test_wal_path("restart.wal");
    let d = date(2026, 10, 22);
    let (booked, svc) = {
        let engine = Engine::new(path.clone()).unwrap();
        engine.put_working_hours(WorkingHours::fallback(4)).await.unwrap();
        engine.set_date_closed(date(2026, 12, 25), true).await.unwrap();
        let svc = engine.save_service(service("Cut", 0)).await.unwrap();
        let booked = engine.book_appointment(appointment(d, "11:00", "1")).await.unwrap();
        engine
            .review_appointment(review(booked.id, AppointmentStatus::Pending, AppointmentStatus::Rejected))
            .await
            .unwrap();
        (booked, svc)
    };

    let engine = Engine::new(path).unwrap();
    assert_eq!(engine.working_hours(4), Some(WorkingHours::fallback(4)));
    assert!(engine.is_date_closed(&date(2026, 12, 25)));
    assert_eq!(engine.service(&svc.id), Some(svc));
    let restored = engine.appointment(&booked.id).await.unwrap();
    assert_eq!(restored.status, AppointmentStatus::Rejected);
    assert_eq!(restored.reviewed_by.as_deref(), Some("admin-1"));

    // The rejected slot is bookable after restart too.
    engine.book_appointment(appointment(d, "11:00", "2")).await.unwrap();
}

#[tokio::test]
async fn compact_wal_preserves_state() {
    let path = test_wal_path("compact_state.wal");
    let d = date(2026, 10, 23);
    let engine = Engine::new(path.clone()).unwrap();

    for _ in 0..10 {
        let mut wh = WorkingHours::fallback(5);
        wh.slot_interval += 15;
        engine.put_working_hours(wh).await.unwrap();
    }
    for i in 0..5 {
        let c = date(2027, 1, 1 + i);
        engine.set_date_closed(c, true).await.unwrap();
        engine.set_date_closed(c, false).await.unwrap();
    }
    let kept = engine.book_appointment(appointment(d, "09:30", "1")).await.unwrap();
    engine
        .review_appointment(review(kept.id, AppointmentStatus::Pending, AppointmentStatus::Approved))
        .await
        .unwrap();

    let size_before = std::fs::metadata(&path).unwrap().len();
    engine.compact_wal().await.unwrap();
    let size_after = std::fs::metadata(&path).unwrap().len();
    assert!(size_after < size_before, "compacted WAL ({size_after}) should be smaller than original ({size_before})");
    assert_eq!(engine.wal_appends_since_compact().await, 0);

    // Append after compaction, then restart from the compacted log.
    engine.book_appointment(appointment(d, "10:00", "2")).await.unwrap();
    drop(engine);

    let engine = Engine::new(path).unwrap();
    assert!(engine.closed_dates().is_empty());
    assert_eq!(engine.working_hours(5).map(|h| h.slot_interval), Some(45));
    let restored = engine.appointment(&kept.id).await.unwrap();
    assert_eq!(restored.status, AppointmentStatus::Approved);
    assert_eq!(engine.appointments_on(&d).await.len(), 2);
}

#[tokio::test]
async fn group_commit_batches_appends() {
    let path = test_wal_path("group_commit.wal");
    let engine = Arc::new(Engine::new(path.clone()).unwrap());
    let d = date(2026, 11, 4);

    let n = 20;
    let mut handles = Vec::new();
    for i in 0..n {
        let eng = engine.clone();
        handles.push(tokio::spawn(async move {
            let slot = SlotTime::from_minutes(9 * 60 + i * 15).unwrap().to_string();
            eng.book_appointment(appointment(d, &slot, "1")).await
        }));
    }
    for h in handles {
        h.await.unwrap().unwrap();
    }
    assert_eq!(engine.wal_appends_since_compact().await, u64::from(n));

    let engine2 = Engine::new(path).unwrap();
    assert_eq!(engine2.appointments_on(&d).await.len(), n as usize);
}

#[tokio::test]
async fn dropped_booking_future_still_commits() {
    use futures::FutureExt;

    let path = test_wal_path("dropped_booking.wal");
    let d = date(2026, 11, 5);
    let engine = Engine::new(path.clone()).unwrap();

    // One poll takes the locks and hands the commit off; then the caller goes away.
    let first = appointment(d, "10:00", "1");
    assert!(engine.book_appointment(first.clone()).now_or_never().is_none());

    let err = engine
        .book_appointment(appointment(d, "10:00", "2"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::SlotTaken { holder, .. } if holder == first.id));
    assert_eq!(engine.appointment(&first.id).await.map(|a| a.id), Some(first.id));
    drop(engine);

    let engine = Engine::new(path).unwrap();
    let holders: Vec<Ulid> = engine
        .appointments_on(&d)
        .await
        .iter()
        .filter(|a| a.holds_slot())
        .map(|a| a.id)
        .collect();
    assert_eq!(holders, vec![first.id]);
}

#[tokio::test]
async fn replay_discards_second_holder_of_a_slot() {
    let path = test_wal_path("replay_collision.wal");
    let d = date(2026, 11, 6);
    let first = appointment(d, "10:00", "1");
    let second = appointment(d, "10:00", "2");
    let mut released = appointment(d, "10:30", "3");
    released.status = AppointmentStatus::Rejected;
    let after_release = appointment(d, "10:30", "4");
    {
        let mut wal = Wal::open(&path).unwrap();
        for a in [&first, &second, &released, &after_release] {
            wal.append(&Event::AppointmentBooked { appointment: a.clone() })
                .unwrap();
        }
    }

    let engine = Engine::new(path).unwrap();
    assert!(engine.appointment(&first.id).await.is_some());
    assert!(engine.appointment(&second.id).await.is_none());
    assert!(engine.appointment(&released.id).await.is_some());
    assert!(engine.appointment(&after_release.id).await.is_some());
    assert_eq!(engine.appointments_on(&d).await.len(), 3);

    let err = engine
        .book_appointment(appointment(d, "10:00", "5"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::SlotTaken { holder, .. } if holder == first.id));
}
