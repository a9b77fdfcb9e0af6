//! In-memory implementation of every port.
//!
//! One `RwLock` guards all collections, so each trait method is a single
//! atomic unit: renumbered day lists and slot upserts are published whole,
//! pair upserts cannot race, and a catalog cascade never half-completes.

use crate::core::catalog::Selections;
use crate::core::itinerary::{Itinerary, Tour};
use crate::domain::model::{
    CatalogItem, CatalogItemId, CatalogKind, CombinationEntry, ImageRole, ImageSlot,
    ItineraryId, OwnerRef, PairKey, TourId,
};
use crate::domain::ports::{
    CatalogStore, CombinationStore, DefaultImageRegistry, ImageSlotStore, ItineraryStore,
    TourStore,
};
use crate::utils::error::{EngineError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct State {
    combinations: HashMap<PairKey, CombinationEntry>,
    slots: HashMap<(OwnerRef, ImageRole), ImageSlot>,
    defaults: HashMap<ImageRole, String>,
    catalog: HashMap<CatalogItemId, CatalogItem>,
    itineraries: HashMap<ItineraryId, Itinerary>,
    tours: HashMap<TourId, Tour>,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl State {
    fn ensure_owner(&self, owner: OwnerRef) -> Result<()> {
        let exists = match owner {
            OwnerRef::Itinerary(id) => self.itineraries.contains_key(&id),
            OwnerRef::Tour(id) => self.tours.contains_key(&id),
        };
        if exists {
            Ok(())
        } else {
            Err(EngineError::not_found("Image owner", owner))
        }
    }

    /// Acts as the foreign-key check a relational backend would do on save.
    fn check_references(&self, selections: &Selections) -> Result<()> {
        let dangling = [CatalogKind::Inclusion, CatalogKind::Exclusion]
            .into_iter()
            .flat_map(|kind| selections.ids(kind).iter())
            .find(|id| !self.catalog.contains_key(*id));
        match dangling {
            Some(id) => Err(EngineError::conflict(format!(
                "catalog item {} was deleted while the owner was being edited",
                id
            ))),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CombinationStore for InMemoryStore {
    async fn upsert_combination(&self, entry: CombinationEntry) -> Result<CombinationEntry> {
        let mut state = self.state.write().await;
        let stored = state
            .combinations
            .entry(entry.key())
            .and_modify(|existing| existing.absorb(entry.clone()))
            .or_insert(entry);
        Ok(stored.clone())
    }

    async fn find_combination(&self, key: PairKey) -> Result<Option<CombinationEntry>> {
        let state = self.state.read().await;
        Ok(state.combinations.get(&key).cloned())
    }

    async fn delete_combination(&self, key: PairKey) -> Result<()> {
        let mut state = self.state.write().await;
        state
            .combinations
            .remove(&key)
            .map(|_| ())
            .ok_or_else(|| EngineError::not_found("Combination", key))
    }

    async fn list_combinations(&self) -> Result<Vec<CombinationEntry>> {
        let state = self.state.read().await;
        let mut entries: Vec<CombinationEntry> = state.combinations.values().cloned().collect();
        entries.sort_by_key(|e| e.key());
        Ok(entries)
    }
}

#[async_trait]
impl ImageSlotStore for InMemoryStore {
    async fn put_slot(&self, slot: ImageSlot) -> Result<()> {
        let mut state = self.state.write().await;
        state.ensure_owner(slot.owner)?;
        state.slots.insert((slot.owner, slot.role), slot);
        Ok(())
    }

    async fn get_slot(&self, owner: OwnerRef, role: ImageRole) -> Result<Option<ImageSlot>> {
        let state = self.state.read().await;
        Ok(state.slots.get(&(owner, role)).cloned())
    }

    async fn remove_slot(&self, owner: OwnerRef, role: ImageRole) -> Result<()> {
        let mut state = self.state.write().await;
        state
            .slots
            .remove(&(owner, role))
            .map(|_| ())
            .ok_or_else(|| EngineError::not_found("Image slot", format!("{} {}", owner, role)))
    }

    async fn list_slots(&self, owner: OwnerRef) -> Result<Vec<ImageSlot>> {
        let state = self.state.read().await;
        let mut slots: Vec<ImageSlot> = state
            .slots
            .values()
            .filter(|slot| slot.owner == owner)
            .cloned()
            .collect();
        slots.sort_by_key(|slot| slot.role);
        Ok(slots)
    }
}

#[async_trait]
impl DefaultImageRegistry for InMemoryStore {
    async fn get_default(&self, role: ImageRole) -> Result<Option<String>> {
        let state = self.state.read().await;
        Ok(state.defaults.get(&role).cloned())
    }

    async fn set_default(&self, role: ImageRole, image_url: String) -> Result<()> {
        let mut state = self.state.write().await;
        state.defaults.insert(role, image_url);
        Ok(())
    }

    async fn remove_default(&self, role: ImageRole) -> Result<()> {
        let mut state = self.state.write().await;
        state
            .defaults
            .remove(&role)
            .map(|_| ())
            .ok_or_else(|| EngineError::not_found("Default image", role))
    }
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn insert_item(&self, item: CatalogItem) -> Result<()> {
        let mut state = self.state.write().await;
        if state.catalog.contains_key(&item.id) {
            return Err(EngineError::conflict(format!(
                "catalog item {} already exists",
                item.id
            )));
        }
        state.catalog.insert(item.id, item);
        Ok(())
    }

    async fn update_item(&self, item: CatalogItem) -> Result<()> {
        let mut state = self.state.write().await;
        match state.catalog.get_mut(&item.id) {
            Some(existing) => {
                *existing = item;
                Ok(())
            }
            None => Err(EngineError::not_found("Catalog item", item.id)),
        }
    }

    async fn get_item(&self, id: CatalogItemId) -> Result<CatalogItem> {
        let state = self.state.read().await;
        state
            .catalog
            .get(&id)
            .cloned()
            .ok_or_else(|| EngineError::not_found("Catalog item", id))
    }

    async fn list_items(&self, kind: CatalogKind) -> Result<Vec<CatalogItem>> {
        let state = self.state.read().await;
        let mut items: Vec<CatalogItem> = state
            .catalog
            .values()
            .filter(|item| item.kind == kind)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    async fn delete_item_cascade(&self, id: CatalogItemId) -> Result<usize> {
        let mut state = self.state.write().await;
        if state.catalog.remove(&id).is_none() {
            return Err(EngineError::not_found("Catalog item", id));
        }

        // Stripping bumps the version so an editor holding a stale copy
        // cannot save the reference back.
        let mut cleaned = 0;
        for itinerary in state.itineraries.values_mut() {
            if itinerary.selections_mut().strip(id) {
                itinerary.version += 1;
                itinerary.touch();
                cleaned += 1;
            }
        }
        for tour in state.tours.values_mut() {
            if tour.selections_mut().strip(id) {
                tour.version += 1;
                tour.touch();
                cleaned += 1;
            }
        }
        Ok(cleaned)
    }
}

#[async_trait]
impl ItineraryStore for InMemoryStore {
    async fn insert_itinerary(&self, itinerary: Itinerary) -> Result<()> {
        let mut state = self.state.write().await;
        if state.itineraries.contains_key(&itinerary.id) {
            return Err(EngineError::conflict(format!(
                "itinerary {} already exists",
                itinerary.id
            )));
        }
        state.check_references(itinerary.selections())?;
        state.itineraries.insert(itinerary.id, itinerary);
        Ok(())
    }

    async fn get_itinerary(&self, id: ItineraryId) -> Result<Itinerary> {
        let state = self.state.read().await;
        state
            .itineraries
            .get(&id)
            .cloned()
            .ok_or_else(|| EngineError::not_found("Itinerary", id))
    }

    async fn save_itinerary(&self, mut itinerary: Itinerary) -> Result<Itinerary> {
        let mut state = self.state.write().await;
        let stored = state
            .itineraries
            .get(&itinerary.id)
            .ok_or_else(|| EngineError::not_found("Itinerary", itinerary.id))?;
        if stored.version != itinerary.version {
            return Err(EngineError::conflict(format!(
                "itinerary {} was modified concurrently (stored version {}, loaded {})",
                itinerary.id, stored.version, itinerary.version
            )));
        }
        state.check_references(itinerary.selections())?;
        itinerary.version += 1;
        state.itineraries.insert(itinerary.id, itinerary.clone());
        Ok(itinerary)
    }

    async fn delete_itinerary(&self, id: ItineraryId) -> Result<()> {
        let mut state = self.state.write().await;
        if state.itineraries.remove(&id).is_none() {
            return Err(EngineError::not_found("Itinerary", id));
        }
        state
            .slots
            .retain(|(owner, _), _| *owner != OwnerRef::Itinerary(id));
        Ok(())
    }

    async fn list_itineraries(&self) -> Result<Vec<Itinerary>> {
        let state = self.state.read().await;
        let mut itineraries: Vec<Itinerary> = state.itineraries.values().cloned().collect();
        itineraries.sort_by_key(|it| it.created_at);
        Ok(itineraries)
    }
}

#[async_trait]
impl TourStore for InMemoryStore {
    async fn insert_tour(&self, tour: Tour) -> Result<()> {
        let mut state = self.state.write().await;
        if state.tours.contains_key(&tour.id) {
            return Err(EngineError::conflict(format!("tour {} already exists", tour.id)));
        }
        state.check_references(tour.selections())?;
        state.tours.insert(tour.id, tour);
        Ok(())
    }

    async fn get_tour(&self, id: TourId) -> Result<Tour> {
        let state = self.state.read().await;
        state
            .tours
            .get(&id)
            .cloned()
            .ok_or_else(|| EngineError::not_found("Tour", id))
    }

    async fn save_tour(&self, mut tour: Tour) -> Result<Tour> {
        let mut state = self.state.write().await;
        let stored = state
            .tours
            .get(&tour.id)
            .ok_or_else(|| EngineError::not_found("Tour", tour.id))?;
        if stored.version != tour.version {
            return Err(EngineError::conflict(format!(
                "tour {} was modified concurrently (stored version {}, loaded {})",
                tour.id, stored.version, tour.version
            )));
        }
        state.check_references(tour.selections())?;
        tour.version += 1;
        state.tours.insert(tour.id, tour.clone());
        Ok(tour)
    }

    async fn delete_tour(&self, id: TourId) -> Result<()> {
        let mut state = self.state.write().await;
        if state.tours.remove(&id).is_none() {
            return Err(EngineError::not_found("Tour", id));
        }
        state.slots.retain(|(owner, _), _| *owner != OwnerRef::Tour(id));
        Ok(())
    }

    async fn list_tours(&self) -> Result<Vec<Tour>> {
        let state = self.state.read().await;
        let mut tours: Vec<Tour> = state.tours.values().cloned().collect();
        tours.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(tours)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schedule::ScheduleRules;
    use crate::domain::model::DestinationId;

    #[tokio::test]
    async fn test_upsert_keeps_one_entry_per_pair() {
        let store = InMemoryStore::new();
        let a = DestinationId::new();
        let b = DestinationId::new();

        let first = store
            .upsert_combination(CombinationEntry::new(a, Some(b), "First", "", false))
            .await
            .unwrap();
        let second = store
            .upsert_combination(CombinationEntry::new(b, Some(a), "Second", "", true))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        let all = store.list_combinations().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].description, "Second");
        assert_eq!(all[0].destination_a, b);
    }

    #[tokio::test]
    async fn test_concurrent_upserts_for_one_pair_never_duplicate() {
        let store = InMemoryStore::new();
        let a = DestinationId::new();
        let b = DestinationId::new();

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let (from, to) = if i % 2 == 0 { (a, b) } else { (b, a) };
                let entry = CombinationEntry::new(from, Some(to), format!("v{}", i), "", true);
                store.upsert_combination(entry).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.list_combinations().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_stale_save_is_a_conflict() {
        let store = InMemoryStore::new();
        let itinerary = Itinerary::new("Azores", "EUR", 2, &ScheduleRules::default()).unwrap();
        store.insert_itinerary(itinerary.clone()).await.unwrap();

        let saved = store.save_itinerary(itinerary.clone()).await.unwrap();
        assert_eq!(saved.version, 1);

        let err = store.save_itinerary(itinerary).await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_deleting_itinerary_drops_its_slots() {
        let store = InMemoryStore::new();
        let itinerary = Itinerary::new("Madeira", "EUR", 1, &ScheduleRules::default()).unwrap();
        let owner = OwnerRef::Itinerary(itinerary.id);
        store.insert_itinerary(itinerary.clone()).await.unwrap();
        store
            .put_slot(ImageSlot {
                owner,
                role: ImageRole::Cover,
                image_url: "cover.jpg".to_string(),
                updated_at: chrono::Utc::now(),
            })
            .await
            .unwrap();

        store.delete_itinerary(itinerary.id).await.unwrap();
        assert!(store.list_slots(owner).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_slot_for_missing_owner_is_rejected() {
        let store = InMemoryStore::new();
        let owner = OwnerRef::Tour(TourId::new());

        let err = store
            .put_slot(ImageSlot {
                owner,
                role: ImageRole::End,
                image_url: "end.jpg".to_string(),
                updated_at: chrono::Utc::now(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::NotFoundError { .. }));
        assert!(store.list_slots(owner).await.unwrap().is_empty());
    }
}
