//! Collaborator contracts the engine is built against.
//!
//! Every method is one atomic unit at the store boundary: a reader never
//! observes half of a call's effect.

use crate::core::itinerary::{Itinerary, Tour};
use crate::domain::model::{
    CatalogItem, CatalogItemId, CatalogKind, CombinationEntry, ImageRole, ImageSlot,
    ItineraryId, OwnerRef, PairKey, TourId,
};
use crate::utils::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait CombinationStore: Send + Sync {
    /// Inserts the entry, or folds it into the existing entry for the same
    /// pair key. The check and the write are serialized per key.
    async fn upsert_combination(&self, entry: CombinationEntry) -> Result<CombinationEntry>;
    async fn find_combination(&self, key: PairKey) -> Result<Option<CombinationEntry>>;
    async fn delete_combination(&self, key: PairKey) -> Result<()>;
    async fn list_combinations(&self) -> Result<Vec<CombinationEntry>>;
}

#[async_trait]
pub trait ImageSlotStore: Send + Sync {
    /// Upsert keyed by `(owner, role)`. Fails with NotFound when the owner
    /// does not exist at the moment of the write.
    async fn put_slot(&self, slot: ImageSlot) -> Result<()>;
    async fn get_slot(&self, owner: OwnerRef, role: ImageRole) -> Result<Option<ImageSlot>>;
    async fn remove_slot(&self, owner: OwnerRef, role: ImageRole) -> Result<()>;
    async fn list_slots(&self, owner: OwnerRef) -> Result<Vec<ImageSlot>>;
}

#[async_trait]
pub trait DefaultImageRegistry: Send + Sync {
    async fn get_default(&self, role: ImageRole) -> Result<Option<String>>;
    async fn set_default(&self, role: ImageRole, image_url: String) -> Result<()>;
    async fn remove_default(&self, role: ImageRole) -> Result<()>;
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn insert_item(&self, item: CatalogItem) -> Result<()>;
    async fn update_item(&self, item: CatalogItem) -> Result<()>;
    async fn get_item(&self, id: CatalogItemId) -> Result<CatalogItem>;
    async fn list_items(&self, kind: CatalogKind) -> Result<Vec<CatalogItem>>;
    /// Removes the item and strips its id from every itinerary and tour
    /// selection in one transaction. Returns how many owners were touched.
    async fn delete_item_cascade(&self, id: CatalogItemId) -> Result<usize>;
}

/// Aggregates are saved whole. `save_*` fails with a conflict when the stored
/// version differs from the one the caller loaded, or when the aggregate
/// selects a catalog item that no longer exists. On success the aggregate is
/// returned carrying its new version.
#[async_trait]
pub trait ItineraryStore: Send + Sync {
    async fn insert_itinerary(&self, itinerary: Itinerary) -> Result<()>;
    async fn get_itinerary(&self, id: ItineraryId) -> Result<Itinerary>;
    async fn save_itinerary(&self, itinerary: Itinerary) -> Result<Itinerary>;
    /// Also drops the itinerary's image slots.
    async fn delete_itinerary(&self, id: ItineraryId) -> Result<()>;
    async fn list_itineraries(&self) -> Result<Vec<Itinerary>>;
}

#[async_trait]
pub trait TourStore: Send + Sync {
    async fn insert_tour(&self, tour: Tour) -> Result<()>;
    async fn get_tour(&self, id: TourId) -> Result<Tour>;
    async fn save_tour(&self, tour: Tour) -> Result<Tour>;
    async fn delete_tour(&self, id: TourId) -> Result<()>;
    async fn list_tours(&self) -> Result<Vec<Tour>>;
}
