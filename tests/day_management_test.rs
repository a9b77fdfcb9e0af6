use itinerary_engine::core::schedule::{DaySchedule, ScheduleRules};
use itinerary_engine::core::{DayPatch, OwnerRef};
use itinerary_engine::{EngineConfig, EngineError, InMemoryStore, ItineraryEngine};
use proptest::prelude::*;
use std::sync::Arc;

fn engine() -> ItineraryEngine<InMemoryStore> {
    ItineraryEngine::new(Arc::new(InMemoryStore::new()), &EngineConfig::default())
}

fn day_numbers(schedule: &DaySchedule) -> Vec<u32> {
    schedule.days().iter().map(|d| d.day_number).collect()
}

#[tokio::test]
async fn test_add_and_remove_day_keep_numbering_contiguous() {
    let engine = engine();
    let itinerary = engine.create_itinerary("Alentejo loop", 3).await.unwrap();
    let owner = OwnerRef::Itinerary(itinerary.id);

    let added = engine.add_day(owner).await.unwrap();
    assert_eq!(added, 4);

    let patch = DayPatch {
        title: Some("Evora".to_string()),
        ..Default::default()
    };
    engine.update_day(owner, 3, patch).await.unwrap();
    engine.remove_day(owner, 2).await.unwrap();

    let stored = engine.itinerary(itinerary.id).await.unwrap();
    assert_eq!(day_numbers(stored.schedule()), vec![1, 2, 3]);
    // The old day 3 moved down by one and kept its edits.
    assert_eq!(stored.days()[1].title, "Evora");
    assert_eq!(stored.days()[2].title, "Day 4");
    assert_eq!(stored.version, 3);
}

#[tokio::test]
async fn test_remove_missing_or_last_day_is_rejected() {
    let engine = engine();
    let itinerary = engine.create_itinerary("Day trip", 1).await.unwrap();
    let owner = OwnerRef::Itinerary(itinerary.id);

    assert!(matches!(
        engine.remove_day(owner, 5).await,
        Err(EngineError::NotFoundError { .. })
    ));
    assert!(matches!(
        engine.remove_day(owner, 1).await,
        Err(EngineError::ValidationError { .. })
    ));
    assert_eq!(engine.itinerary(itinerary.id).await.unwrap().number_of_days(), 1);
}

#[tokio::test]
async fn test_duration_change_preserves_leading_days() {
    let engine = engine();
    let itinerary = engine.create_itinerary("Douro valley", 4).await.unwrap();
    let owner = OwnerRef::Itinerary(itinerary.id);

    let patch = DayPatch {
        description: Some("Boat trip between terraced vineyards".to_string()),
        meals_included: Some("Lunch".to_string()),
        ..Default::default()
    };
    engine.update_day(owner, 2, patch).await.unwrap();
    let before = engine.itinerary(itinerary.id).await.unwrap();

    assert!(engine.set_number_of_days(owner, 2).await.unwrap());
    let shrunk = engine.itinerary(itinerary.id).await.unwrap();
    assert_eq!(shrunk.days(), &before.days()[..2]);

    assert!(engine.set_number_of_days(owner, 5).await.unwrap());
    let grown = engine.itinerary(itinerary.id).await.unwrap();
    assert_eq!(&grown.days()[..2], &before.days()[..2]);
    assert_eq!(grown.days()[4].title, "Day 5");
    assert!(grown.days()[4].description.is_empty());

    // Second call with the same target writes nothing.
    assert!(!engine.set_number_of_days(owner, 5).await.unwrap());
    assert_eq!(engine.itinerary(itinerary.id).await.unwrap().version, grown.version);
}

#[tokio::test]
async fn test_duration_bounds_follow_config() {
    let config = EngineConfig::from_toml_str("[schedule]\nmax_days = 10\n").unwrap();
    let engine = ItineraryEngine::new(Arc::new(InMemoryStore::new()), &config);
    let itinerary = engine.create_itinerary("Short break", 3).await.unwrap();
    let owner = OwnerRef::Itinerary(itinerary.id);

    assert!(engine.set_number_of_days(owner, 11).await.is_err());
    assert!(engine.set_number_of_days(owner, 0).await.is_err());
    assert!(engine.create_itinerary("Too long", 11).await.is_err());
}

#[tokio::test]
async fn test_move_day_renumbers() {
    let engine = engine();
    let itinerary = engine.create_itinerary("Azores", 3).await.unwrap();
    let owner = OwnerRef::Itinerary(itinerary.id);
    let patch = DayPatch {
        title: Some("Sete Cidades".to_string()),
        ..Default::default()
    };
    engine.update_day(owner, 1, patch).await.unwrap();

    engine.move_day(owner, 1, 3).await.unwrap();

    let stored = engine.itinerary(itinerary.id).await.unwrap();
    assert_eq!(day_numbers(stored.schedule()), vec![1, 2, 3]);
    assert_eq!(stored.days()[2].title, "Sete Cidades");
}

#[derive(Debug, Clone)]
enum DayOp {
    Add,
    Remove(u32),
    Resize(u32),
    Move(u32, u32),
}

fn day_op() -> impl Strategy<Value = DayOp> {
    prop_oneof![
        Just(DayOp::Add),
        (1..12u32).prop_map(DayOp::Remove),
        (0..12u32).prop_map(DayOp::Resize),
        (1..12u32, 1..12u32).prop_map(|(a, b)| DayOp::Move(a, b)),
    ]
}

proptest! {
    #[test]
    fn prop_schedule_stays_contiguous(
        initial in 1..8u32,
        ops in proptest::collection::vec(day_op(), 0..40)
    ) {
        let rules = ScheduleRules::default();
        let mut schedule = DaySchedule::with_days(initial, &rules).unwrap();

        for op in ops {
            // Rejected operations must leave the schedule intact too.
            let _ = match op {
                DayOp::Add => schedule.add_day(&rules).map(|_| ()),
                DayOp::Remove(n) => schedule.remove_day(n).map(|_| ()),
                DayOp::Resize(n) => schedule.resize(n, &rules).map(|_| ()),
                DayOp::Move(a, b) => schedule.move_day(a, b),
            };
            prop_assert!(!schedule.is_empty());
            let expected: Vec<u32> = (1..=schedule.len() as u32).collect();
            prop_assert_eq!(day_numbers(&schedule), expected);
        }
    }

    #[test]
    fn prop_resize_twice_is_noop(initial in 1..10u32, target in 1..20u32) {
        let rules = ScheduleRules::default();
        let mut schedule = DaySchedule::with_days(initial, &rules).unwrap();
        schedule.resize(target, &rules).unwrap();
        let snapshot = schedule.clone();

        prop_assert!(!schedule.resize(target, &rules).unwrap());
        prop_assert_eq!(schedule, snapshot);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_stored_itinerary_stays_contiguous(
        ops in proptest::collection::vec(day_op(), 1..15)
    ) {
        tokio_test::block_on(async {
            let engine = engine();
            let itinerary = engine.create_itinerary("Random walk", 3).await.unwrap();
            let owner = OwnerRef::Itinerary(itinerary.id);

            for op in ops {
                let _ = match op {
                    DayOp::Add => engine.add_day(owner).await.map(|_| ()),
                    DayOp::Remove(n) => engine.remove_day(owner, n).await,
                    DayOp::Resize(n) => engine.set_number_of_days(owner, n).await.map(|_| ()),
                    DayOp::Move(a, b) => engine.move_day(owner, a, b).await,
                };
                let stored = engine.itinerary(itinerary.id).await.unwrap();
                let expected: Vec<u32> = (1..=stored.number_of_days()).collect();
                assert_eq!(day_numbers(stored.schedule()), expected);
            }
        });
    }
}
