use chrono::NaiveDate;
use itinerary_engine::core::{
    AutoFillOutcome, CatalogKind, CombinationEntry, DayPatch, Destination, ImageRole,
    ItineraryOrigin, OwnerRef, PaymentStatus, Traveler,
};
use itinerary_engine::{EngineConfig, EngineError, InMemoryStore, ItineraryEngine, SeedData};
use rust_decimal::Decimal;
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

fn engine() -> ItineraryEngine<InMemoryStore> {
    ItineraryEngine::new(Arc::new(InMemoryStore::new()), &EngineConfig::default())
}

const BELEM_TO_SINTRA: &str = "Morning in Belem, afternoon among Sintra's palaces";

#[tokio::test]
async fn test_end_to_end_auto_fill_respects_manual_edits() {
    let engine = engine();
    let d1 = Destination::new("Lisbon", "Portugal");
    let d2 = Destination::new("Sintra", "Portugal");
    engine
        .matrix()
        .upsert(CombinationEntry::new(
            d1.id,
            Some(d2.id),
            BELEM_TO_SINTRA,
            "Pena Palace visit",
            true,
        ))
        .await
        .unwrap();

    let itinerary = engine.create_itinerary("Lisbon coast", 3).await.unwrap();
    let owner = OwnerRef::Itinerary(itinerary.id);
    let patch = DayPatch {
        destination_ids: Some(vec![d1.id, d2.id]),
        ..Default::default()
    };
    engine.update_day(owner, 2, patch).await.unwrap();

    let outcome = engine.auto_fill_day(owner, 2).await.unwrap();
    assert_eq!(
        outcome,
        AutoFillOutcome::Applied {
            description_updated: true,
            activity_updated: true,
        }
    );

    let stored = engine.itinerary(itinerary.id).await.unwrap();
    let day = &stored.days()[1];
    assert_eq!(day.description, BELEM_TO_SINTRA);
    assert_eq!(day.activities, "Pena Palace visit");
    assert!(!day.is_description_custom);

    let manual = DayPatch {
        description: Some("Our own words about Sintra".to_string()),
        ..Default::default()
    };
    engine.update_day(owner, 2, manual).await.unwrap();
    assert!(engine.itinerary(itinerary.id).await.unwrap().days()[1].is_description_custom);

    let outcome = engine.auto_fill_day(owner, 2).await.unwrap();
    assert_eq!(
        outcome,
        AutoFillOutcome::Applied {
            description_updated: false,
            activity_updated: false,
        }
    );
    let day = engine.itinerary(itinerary.id).await.unwrap().days()[1].clone();
    assert_eq!(day.description, "Our own words about Sintra");
    assert_eq!(day.activities, "Pena Palace visit");

    // Handing the day back lets the matrix text in again.
    engine.release_custom_content(owner, 2).await.unwrap();
    engine.auto_fill_day(owner, 2).await.unwrap();
    let day = engine.itinerary(itinerary.id).await.unwrap().days()[1].clone();
    assert_eq!(day.description, BELEM_TO_SINTRA);
}

#[tokio::test]
async fn test_auto_fill_installs_text_verbatim() {
    let engine = engine();
    let island = Destination::new("Sao Miguel", "Portugal");
    let crater = Destination::new("Sete Cidades", "Portugal");
    let stored_text = "  - Morning ferry\n  - Afternoon hike\n";
    engine
        .matrix()
        .upsert(CombinationEntry::new(island.id, Some(crater.id), stored_text, "", true))
        .await
        .unwrap();

    let itinerary = engine.create_itinerary("Azores", 3).await.unwrap();
    let owner = OwnerRef::Itinerary(itinerary.id);
    let patch = DayPatch {
        destination_ids: Some(vec![crater.id, island.id]),
        ..Default::default()
    };
    engine.update_day(owner, 2, patch).await.unwrap();
    engine.auto_fill_day(owner, 2).await.unwrap();

    let day = engine.itinerary(itinerary.id).await.unwrap().days()[1].clone();
    assert_eq!(day.description, stored_text);
    assert!(day.activities.is_empty());
}

#[tokio::test]
async fn test_auto_fill_without_destinations_is_noop() {
    let engine = engine();
    let itinerary = engine.create_itinerary("Blank", 2).await.unwrap();
    let owner = OwnerRef::Itinerary(itinerary.id);

    assert_eq!(
        engine.auto_fill_day(owner, 1).await.unwrap(),
        AutoFillOutcome::NoContentFound
    );
    let outcomes = engine.auto_fill_all(owner).await.unwrap();
    assert_eq!(outcomes.len(), 2);
    assert_eq!(engine.itinerary(itinerary.id).await.unwrap().version, 0);
    assert!(matches!(
        engine.auto_fill_day(owner, 9).await,
        Err(EngineError::NotFoundError { .. })
    ));
}

#[tokio::test]
async fn test_travel_dates_and_travelers() {
    let engine = engine();
    let itinerary = engine.create_itinerary("Family trip", 4).await.unwrap();
    let id = itinerary.id;

    let departure = NaiveDate::from_ymd_opt(2027, 5, 1).unwrap();
    let derived = engine
        .set_travel_dates(id, Some(departure), None)
        .await
        .unwrap();
    assert_eq!(derived, NaiveDate::from_ymd_opt(2027, 5, 4));
    assert_eq!(engine.itinerary(id).await.unwrap().explicit_return_date(), None);

    let late = NaiveDate::from_ymd_opt(2027, 5, 9).unwrap();
    let effective = engine
        .set_travel_dates(id, Some(departure), Some(late))
        .await
        .unwrap();
    assert_eq!(effective, Some(late));
    assert_eq!(engine.itinerary(id).await.unwrap().explicit_return_date(), Some(late));

    let early = NaiveDate::from_ymd_opt(2027, 4, 20).unwrap();
    assert!(matches!(
        engine.set_travel_dates(id, Some(departure), Some(early)).await,
        Err(EngineError::ValidationError { .. })
    ));

    let ana = engine.add_traveler(id, Traveler::new("Ana Costa")).await.unwrap();
    let rui = engine.add_traveler(id, Traveler::new("Rui Costa")).await.unwrap();
    let stored = engine.itinerary(id).await.unwrap();
    assert_eq!(stored.primary_traveler().map(|t| t.id), Some(ana));

    engine.set_primary_traveler(id, rui).await.unwrap();
    engine.remove_traveler(id, rui).await.unwrap();
    let stored = engine.itinerary(id).await.unwrap();
    assert_eq!(stored.travelers().len(), 1);
    assert_eq!(stored.primary_traveler().map(|t| t.id), Some(ana));

    assert!(engine.add_traveler(id, Traveler::new("  ")).await.is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_edits_never_break_numbering() {
    let engine = Arc::new(engine());
    let itinerary = engine.create_itinerary("Busy", 3).await.unwrap();
    let owner = OwnerRef::Itinerary(itinerary.id);

    let mut handles = Vec::new();
    for _ in 0..16 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move { engine.add_day(owner).await }));
    }

    let mut added = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => added += 1,
            Err(err) => {
                assert!(err.is_retryable(), "unexpected error: {}", err);
            }
        }
    }

    let stored = engine.itinerary(itinerary.id).await.unwrap();
    assert_eq!(stored.number_of_days(), 3 + added);
    let numbers: Vec<u32> = stored.days().iter().map(|d| d.day_number).collect();
    assert_eq!(numbers, (1..=3 + added).collect::<Vec<_>>());
    assert_eq!(stored.version, added as u64);
}

const SEED: &str = r#"
[[destinations]]
name = "Lisbon"
country = "Portugal"

[[destinations]]
name = "Porto"
country = "Portugal"

[[combinations]]
from = "Lisbon"
to = "Porto"
description = "Train up the coast to Porto"
activity = "Ribeira evening walk"

[[combinations]]
from = "Porto"
description = "Port lodges of Gaia"

[default_images]
cover = "https://img.example.com/defaults/cover.jpg"
end = "${SEED_TEST_END_IMAGE}"

[[inclusions]]
name = "Rail tickets"

[[exclusions]]
name = "Travel insurance"

[[tours]]
name = "Lisbon to Porto"
days = 3
base_price = "1450.00"
inclusions = ["Rail tickets"]
exclusions = ["Travel insurance"]
stops = [
    { day = 2, destinations = ["Lisbon", "Porto"] },
    { day = 3, destinations = ["Porto"] },
]

[tours.images]
about_banner = "https://img.example.com/tours/douro.jpg"
"#;

#[tokio::test]
async fn test_seeded_tour_to_itinerary() {
    std::env::set_var("SEED_TEST_END_IMAGE", "https://img.example.com/defaults/end.jpg");
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(SEED.as_bytes()).unwrap();

    let engine = engine();
    let seed = SeedData::from_file(file.path()).unwrap();
    let directory = seed.apply(&engine).await.unwrap();
    assert_eq!(directory.len(), 2);

    let tours = engine.list_tours().await.unwrap();
    assert_eq!(tours.len(), 1);
    let tour = &tours[0];
    assert_eq!(tour.days()[1].description, "Train up the coast to Porto");
    assert_eq!(tour.days()[2].description, "Port lodges of Gaia");
    assert_eq!(tour.selections().ids(CatalogKind::Inclusion).len(), 1);

    let itinerary = engine.create_from_tour(tour.id, false).await.unwrap();
    assert_eq!(itinerary.origin(), ItineraryOrigin::FromTour { tour_id: tour.id });
    assert_eq!(itinerary.total_price(), Decimal::new(145000, 2));
    assert_eq!(itinerary.payment_status(), PaymentStatus::NotPaid);
    assert_eq!(itinerary.days(), tour.days());

    let images = engine
        .resolve_images(OwnerRef::Itinerary(itinerary.id))
        .await
        .unwrap();
    assert_eq!(
        images[&ImageRole::AboutBanner].url(),
        Some("https://img.example.com/tours/douro.jpg")
    );
    assert_eq!(
        images[&ImageRole::End].url(),
        Some("https://img.example.com/defaults/end.jpg")
    );
    assert!(images[&ImageRole::Inclusions].is_absent());

    // Editing the template afterwards leaves the clone alone.
    engine
        .update_day(
            OwnerRef::Tour(tour.id),
            1,
            DayPatch {
                title: Some("Arrival".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let clone = engine.itinerary(itinerary.id).await.unwrap();
    assert_eq!(clone.days()[0].title, "Day 1");
}

#[tokio::test]
async fn test_seed_with_unknown_role_is_rejected() {
    let seed = SeedData::from_toml_str(
        r#"
[default_images]
hero = "https://img.example.com/hero.jpg"
"#,
    )
    .unwrap();

    let result = seed.apply(&engine()).await;
    assert!(matches!(result, Err(EngineError::ValidationError { .. })));
}
