use crate::config::EngineConfig;
use crate::core::catalog::{Catalog, Selections};
use crate::core::combination::CombinationMatrix;
use crate::core::image_slots::ImageSlotManager;
use crate::core::itinerary::{Itinerary, Tour};
use crate::core::schedule::{DaySchedule, ScheduleRules};
use crate::domain::model::{
    AutoFillOutcome, CatalogItemId, CombinationContent, DayPatch, DestinationId, ImageRole,
    ImageSlot, ItineraryId, ItineraryStatus, OwnerRef, PaymentStatus, ResolveMode,
    ResolvedImage, TourId, Traveler, TravelerId,
};
use crate::domain::ports::{
    CatalogStore, CombinationStore, DefaultImageRegistry, ImageSlotStore, ItineraryStore,
    TourStore,
};
use crate::utils::error::{EngineError, Result};
use crate::utils::validation::Validate;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Everything the engine needs from persistence, usually one backend.
pub trait EngineStore:
    ItineraryStore
    + TourStore
    + CombinationStore
    + ImageSlotStore
    + DefaultImageRegistry
    + CatalogStore
{
}

impl<T> EngineStore for T where
    T: ItineraryStore
        + TourStore
        + CombinationStore
        + ImageSlotStore
        + DefaultImageRegistry
        + CatalogStore
{
}

/// Facade over the composition rules. Each public method is one logical
/// operation: load the owning aggregate, apply the rule, validate, save.
/// Saves are version-checked, so a concurrent edit surfaces as a conflict
/// for the caller to retry.
pub struct ItineraryEngine<S: EngineStore> {
    store: Arc<S>,
    matrix: CombinationMatrix<S>,
    images: ImageSlotManager<S, S>,
    catalog: Catalog<S>,
    rules: ScheduleRules,
    default_currency: String,
}

impl<S: EngineStore> ItineraryEngine<S> {
    pub fn new(store: Arc<S>, config: &EngineConfig) -> Self {
        Self {
            matrix: CombinationMatrix::new(store.clone(), config.content.chain_joiner.clone()),
            images: ImageSlotManager::new(store.clone(), store.clone()),
            catalog: Catalog::new(store.clone()),
            rules: config.schedule_rules(),
            default_currency: config.pricing.default_currency.clone(),
            store,
        }
    }

    pub fn matrix(&self) -> &CombinationMatrix<S> {
        &self.matrix
    }

    pub fn images(&self) -> &ImageSlotManager<S, S> {
        &self.images
    }

    pub fn catalog(&self) -> &Catalog<S> {
        &self.catalog
    }

    pub fn rules(&self) -> &ScheduleRules {
        &self.rules
    }

    // -----------------------------------------------------------------------
    // Creation
    // -----------------------------------------------------------------------

    pub async fn create_itinerary(
        &self,
        title: impl Into<String>,
        number_of_days: u32,
    ) -> Result<Itinerary> {
        let currency = self.default_currency.clone();
        let itinerary = Itinerary::new(title, currency, number_of_days, &self.rules)?;
        self.store.insert_itinerary(itinerary.clone()).await?;
        tracing::info!(
            itinerary_id = %itinerary.id,
            days = number_of_days,
            "itinerary created from scratch"
        );
        Ok(itinerary)
    }

    /// Clones a tour template, including its image slots.
    pub async fn create_from_tour(&self, tour_id: TourId, edited: bool) -> Result<Itinerary> {
        let tour = self.store.get_tour(tour_id).await?;
        let itinerary = Itinerary::from_tour(&tour, edited);
        self.store.insert_itinerary(itinerary.clone()).await?;
        let copied = self
            .images
            .copy_slots(OwnerRef::Tour(tour_id), OwnerRef::Itinerary(itinerary.id))
            .await?;
        tracing::info!(
            itinerary_id = %itinerary.id,
            %tour_id,
            edited,
            slots_copied = copied,
            "itinerary cloned from tour"
        );
        Ok(itinerary)
    }

    pub async fn create_tour(&self, name: impl Into<String>, number_of_days: u32) -> Result<Tour> {
        let tour = Tour::new(name, self.default_currency.clone(), number_of_days, &self.rules)?;
        self.store.insert_tour(tour.clone()).await?;
        tracing::info!(tour_id = %tour.id, days = number_of_days, "tour template created");
        Ok(tour)
    }

    pub async fn itinerary(&self, id: ItineraryId) -> Result<Itinerary> {
        self.store.get_itinerary(id).await
    }

    pub async fn tour(&self, id: TourId) -> Result<Tour> {
        self.store.get_tour(id).await
    }

    pub async fn list_itineraries(&self) -> Result<Vec<Itinerary>> {
        self.store.list_itineraries().await
    }

    pub async fn list_tours(&self) -> Result<Vec<Tour>> {
        self.store.list_tours().await
    }

    pub async fn delete_itinerary(&self, id: ItineraryId) -> Result<()> {
        self.store.delete_itinerary(id).await?;
        tracing::info!(itinerary_id = %id, "itinerary deleted");
        Ok(())
    }

    pub async fn delete_tour(&self, id: TourId) -> Result<()> {
        self.store.delete_tour(id).await?;
        tracing::info!(tour_id = %id, "tour deleted");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Load / mutate / save
    // -----------------------------------------------------------------------

    /// Applies `f` to a fresh copy of the itinerary. Nothing is written when
    /// `f` leaves the aggregate unchanged.
    pub async fn modify_itinerary<T, F>(&self, id: ItineraryId, f: F) -> Result<T>
    where
        F: FnOnce(&mut Itinerary) -> Result<T> + Send,
        T: Send,
    {
        let current = self.store.get_itinerary(id).await?;
        let mut updated = current.clone();
        let outcome = f(&mut updated)?;
        if updated == current {
            tracing::debug!(itinerary_id = %id, "no change, skipping save");
            return Ok(outcome);
        }

        updated.validate()?;
        updated.touch();
        self.store
            .save_itinerary(updated)
            .await
            .map_err(|err| log_conflict(err, OwnerRef::Itinerary(id)))?;
        Ok(outcome)
    }

    pub async fn modify_tour<T, F>(&self, id: TourId, f: F) -> Result<T>
    where
        F: FnOnce(&mut Tour) -> Result<T> + Send,
        T: Send,
    {
        let current = self.store.get_tour(id).await?;
        let mut updated = current.clone();
        let outcome = f(&mut updated)?;
        if updated == current {
            return Ok(outcome);
        }

        updated.validate()?;
        updated.touch();
        self.store
            .save_tour(updated)
            .await
            .map_err(|err| log_conflict(err, OwnerRef::Tour(id)))?;
        Ok(outcome)
    }

    async fn modify_schedule<T, F>(&self, owner: OwnerRef, f: F) -> Result<T>
    where
        F: FnOnce(&mut DaySchedule) -> Result<T> + Send,
        T: Send,
    {
        match owner {
            OwnerRef::Itinerary(id) => self.modify_itinerary(id, |it| f(it.schedule_mut())).await,
            OwnerRef::Tour(id) => self.modify_tour(id, |tour| f(tour.schedule_mut())).await,
        }
    }

    async fn modify_selections<T, F>(&self, owner: OwnerRef, f: F) -> Result<T>
    where
        F: FnOnce(&mut Selections) -> Result<T> + Send,
        T: Send,
    {
        match owner {
            OwnerRef::Itinerary(id) => self.modify_itinerary(id, |it| f(it.selections_mut())).await,
            OwnerRef::Tour(id) => self.modify_tour(id, |tour| f(tour.selections_mut())).await,
        }
    }

    async fn load_schedule(&self, owner: OwnerRef) -> Result<DaySchedule> {
        match owner {
            OwnerRef::Itinerary(id) => Ok(self.store.get_itinerary(id).await?.schedule().clone()),
            OwnerRef::Tour(id) => Ok(self.store.get_tour(id).await?.schedule().clone()),
        }
    }

    async fn ensure_owner(&self, owner: OwnerRef) -> Result<()> {
        match owner {
            OwnerRef::Itinerary(id) => self.store.get_itinerary(id).await.map(|_| ()),
            OwnerRef::Tour(id) => self.store.get_tour(id).await.map(|_| ()),
        }
    }

    // -----------------------------------------------------------------------
    // Days
    // -----------------------------------------------------------------------

    pub async fn add_day(&self, owner: OwnerRef) -> Result<u32> {
        let rules = &self.rules;
        let day_number = self
            .modify_schedule(owner, |schedule| schedule.add_day(rules))
            .await?;
        tracing::info!(%owner, day_number, "day added");
        Ok(day_number)
    }

    pub async fn remove_day(&self, owner: OwnerRef, day_number: u32) -> Result<()> {
        self.modify_schedule(owner, |schedule| schedule.remove_day(day_number))
            .await?;
        tracing::info!(%owner, day_number, "day removed and schedule renumbered");
        Ok(())
    }

    pub async fn move_day(&self, owner: OwnerRef, from: u32, to: u32) -> Result<()> {
        self.modify_schedule(owner, |schedule| schedule.move_day(from, to))
            .await?;
        tracing::info!(%owner, from, to, "day moved");
        Ok(())
    }

    /// Regenerates the day list for a new duration. Returns whether anything
    /// changed.
    pub async fn set_number_of_days(&self, owner: OwnerRef, number_of_days: u32) -> Result<bool> {
        let rules = &self.rules;
        let changed = self
            .modify_schedule(owner, |schedule| schedule.resize(number_of_days, rules))
            .await?;
        if changed {
            tracing::info!(%owner, number_of_days, "day list regenerated");
        }
        Ok(changed)
    }

    pub async fn update_day(
        &self,
        owner: OwnerRef,
        day_number: u32,
        patch: DayPatch,
    ) -> Result<()> {
        self.modify_schedule(owner, |schedule| schedule.update_day(day_number, patch))
            .await?;
        tracing::debug!(%owner, day_number, "day updated");
        Ok(())
    }

    pub async fn release_custom_content(&self, owner: OwnerRef, day_number: u32) -> Result<()> {
        self.modify_schedule(owner, |schedule| schedule.release_custom_content(day_number))
            .await
    }

    /// Resolves the day's destinations through the matrix in chain mode and
    /// installs the content on fields nobody has edited by hand.
    pub async fn auto_fill_day(&self, owner: OwnerRef, day_number: u32) -> Result<AutoFillOutcome> {
        let schedule = self.load_schedule(owner).await?;
        let destination_ids = schedule.day(day_number)?.destination_ids.clone();
        if destination_ids.is_empty() {
            tracing::debug!(%owner, day_number, "day has no destinations, nothing to fill");
            return Ok(AutoFillOutcome::NoContentFound);
        }

        let content = self.matrix.resolve(&destination_ids, ResolveMode::Chain).await?;
        let outcome = self
            .modify_schedule(owner, |schedule| {
                let current = &schedule.day(day_number)?.destination_ids;
                if *current != destination_ids {
                    return Err(EngineError::conflict(format!(
                        "destinations of day {} changed while resolving content",
                        day_number
                    )));
                }
                schedule.auto_fill(day_number, &content)
            })
            .await?;
        tracing::info!(%owner, day_number, ?outcome, "auto-fill finished");
        Ok(outcome)
    }

    /// Auto-fills every day that has destinations.
    pub async fn auto_fill_all(&self, owner: OwnerRef) -> Result<Vec<(u32, AutoFillOutcome)>> {
        let schedule = self.load_schedule(owner).await?;
        let mut outcomes = Vec::with_capacity(schedule.len());
        for day in schedule.days() {
            let outcome = self.auto_fill_day(owner, day.day_number).await?;
            outcomes.push((day.day_number, outcome));
        }
        Ok(outcomes)
    }

    pub async fn resolve_content(
        &self,
        destination_ids: &[DestinationId],
        mode: ResolveMode,
    ) -> Result<CombinationContent> {
        self.matrix.resolve(destination_ids, mode).await
    }

    // -----------------------------------------------------------------------
    // Status and money
    // -----------------------------------------------------------------------

    pub async fn set_pricing(
        &self,
        id: ItineraryId,
        total: Option<Decimal>,
        deposit: Option<Decimal>,
    ) -> Result<PaymentStatus> {
        let status = self
            .modify_itinerary(id, |it| {
                it.set_pricing(total, deposit)?;
                Ok(it.payment_status())
            })
            .await?;
        tracing::info!(itinerary_id = %id, payment_status = ?status, "pricing updated");
        Ok(status)
    }

    pub async fn override_payment_status(
        &self,
        id: ItineraryId,
        status: PaymentStatus,
    ) -> Result<()> {
        self.modify_itinerary(id, |it| {
            it.override_payment_status(status);
            Ok(())
        })
        .await?;
        tracing::info!(itinerary_id = %id, payment_status = ?status, "payment status overridden");
        Ok(())
    }

    pub async fn set_status(&self, id: ItineraryId, status: ItineraryStatus) -> Result<()> {
        self.modify_itinerary(id, |it| {
            it.set_status(status);
            Ok(())
        })
        .await?;
        tracing::info!(itinerary_id = %id, ?status, "itinerary status set");
        Ok(())
    }

    /// Changes the pricing currency. Amounts are not converted.
    pub async fn set_currency(&self, id: ItineraryId, currency: impl Into<String>) -> Result<()> {
        let currency = currency.into();
        self.modify_itinerary(id, |it| it.set_currency(currency.clone()))
            .await?;
        tracing::info!(itinerary_id = %id, %currency, "currency set");
        Ok(())
    }

    pub async fn set_travel_dates(
        &self,
        id: ItineraryId,
        departure: Option<NaiveDate>,
        return_date: Option<NaiveDate>,
    ) -> Result<Option<NaiveDate>> {
        self.modify_itinerary(id, |it| {
            // Clear first so the order check only sees the new pair.
            it.set_return_date(None)?;
            it.set_departure_date(departure)?;
            it.set_return_date(return_date)?;
            Ok(it.effective_return_date())
        })
        .await
    }

    // -----------------------------------------------------------------------
    // Travelers
    // -----------------------------------------------------------------------

    pub async fn add_traveler(&self, id: ItineraryId, traveler: Traveler) -> Result<TravelerId> {
        self.modify_itinerary(id, |it| it.add_traveler(traveler)).await
    }

    pub async fn remove_traveler(&self, id: ItineraryId, traveler_id: TravelerId) -> Result<()> {
        self.modify_itinerary(id, |it| it.remove_traveler(traveler_id).map(|_| ()))
            .await
    }

    pub async fn set_primary_traveler(
        &self,
        id: ItineraryId,
        traveler_id: TravelerId,
    ) -> Result<()> {
        self.modify_itinerary(id, |it| it.set_primary_traveler(traveler_id))
            .await
    }

    // -----------------------------------------------------------------------
    // Inclusions / exclusions
    // -----------------------------------------------------------------------

    /// Selects a catalog item by reference; its kind decides the set.
    pub async fn select_item(&self, owner: OwnerRef, item_id: CatalogItemId) -> Result<bool> {
        let item = self.catalog.get(item_id).await?;
        let added = self
            .modify_selections(owner, |selections| Ok(selections.select(item.kind, item.id)))
            .await?;
        tracing::debug!(%owner, %item_id, added, "catalog item selected");
        Ok(added)
    }

    pub async fn deselect_item(&self, owner: OwnerRef, item_id: CatalogItemId) -> Result<()> {
        let item = self.catalog.get(item_id).await?;
        self.modify_selections(owner, |selections| selections.deselect(item.kind, item.id))
            .await?;
        tracing::debug!(%owner, %item_id, "catalog item deselected");
        Ok(())
    }

    pub async fn delete_catalog_item(&self, item_id: CatalogItemId) -> Result<usize> {
        self.catalog.delete(item_id).await
    }

    // -----------------------------------------------------------------------
    // Images
    // -----------------------------------------------------------------------

    pub async fn set_image(
        &self,
        owner: OwnerRef,
        role: ImageRole,
        image_url: impl Into<String>,
    ) -> Result<ImageSlot> {
        self.images.set_slot(owner, role, image_url).await
    }

    pub async fn clear_image(&self, owner: OwnerRef, role: ImageRole) -> Result<()> {
        self.images.clear_slot(owner, role).await
    }

    pub async fn resolve_image(&self, owner: OwnerRef, role: ImageRole) -> Result<ResolvedImage> {
        self.ensure_owner(owner).await?;
        self.images.resolve(owner, role).await
    }

    pub async fn resolve_images(
        &self,
        owner: OwnerRef,
    ) -> Result<BTreeMap<ImageRole, ResolvedImage>> {
        self.ensure_owner(owner).await?;
        self.images.resolve_all(owner).await
    }
}

fn log_conflict(err: EngineError, owner: OwnerRef) -> EngineError {
    if err.is_retryable() {
        tracing::warn!(%owner, error = %err, "concurrent modification rejected");
    }
    err
}
