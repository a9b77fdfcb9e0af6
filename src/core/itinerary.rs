//! Itinerary root aggregate and the tour templates itineraries are cloned from.

use crate::core::catalog::Selections;
use crate::core::payment::{balance_due, derive_payment_status};
use crate::core::schedule::{DaySchedule, ScheduleRules};
use crate::domain::model::{
    CatalogItemId, CatalogKind, Day, ItineraryId, ItineraryOrigin, ItineraryStatus,
    PaymentStatus, TourId, Traveler, TravelerId,
};
use crate::utils::error::{EngineError, Result};
use crate::utils::validation::{
    validate_currency_code, validate_non_empty_string, validate_non_negative_amount, Validate,
};
use chrono::{DateTime, Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Itinerary {
    pub id: ItineraryId,
    /// Bumped by the store on every successful save.
    pub version: u64,
    title: String,
    origin: ItineraryOrigin,
    status: ItineraryStatus,
    payment_status: PaymentStatus,
    total_price: Decimal,
    deposit_amount: Decimal,
    currency: String,
    departure_date: Option<NaiveDate>,
    return_date: Option<NaiveDate>,
    schedule: DaySchedule,
    travelers: Vec<Traveler>,
    selections: Selections,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Itinerary {
    /// Builds an itinerary from scratch with placeholder days.
    pub fn new(
        title: impl Into<String>,
        currency: impl Into<String>,
        number_of_days: u32,
        rules: &ScheduleRules,
    ) -> Result<Self> {
        let title = title.into();
        let currency = currency.into();
        validate_non_empty_string("title", &title)?;
        validate_currency_code("currency", &currency)?;

        let now = Utc::now();
        Ok(Self {
            id: ItineraryId::new(),
            version: 0,
            title,
            origin: ItineraryOrigin::Scratch,
            status: ItineraryStatus::Draft,
            payment_status: PaymentStatus::NotPaid,
            total_price: Decimal::ZERO,
            deposit_amount: Decimal::ZERO,
            currency,
            departure_date: None,
            return_date: None,
            schedule: DaySchedule::with_days(number_of_days, rules)?,
            travelers: Vec::new(),
            selections: Selections::default(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Deep-copies a tour template. `edited` only changes the recorded origin.
    pub fn from_tour(tour: &Tour, edited: bool) -> Self {
        let origin = if edited {
            ItineraryOrigin::FromTourEdited { tour_id: tour.id }
        } else {
            ItineraryOrigin::FromTour { tour_id: tour.id }
        };
        let now = Utc::now();
        Self {
            id: ItineraryId::new(),
            version: 0,
            title: tour.name.clone(),
            origin,
            status: ItineraryStatus::Draft,
            payment_status: derive_payment_status(tour.base_price, Decimal::ZERO),
            total_price: tour.base_price,
            deposit_amount: Decimal::ZERO,
            currency: tour.currency.clone(),
            departure_date: None,
            return_date: None,
            schedule: tour.schedule.clone(),
            travelers: Vec::new(),
            selections: tour.selections.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) -> Result<()> {
        let title = title.into();
        validate_non_empty_string("title", &title)?;
        self.title = title;
        Ok(())
    }

    pub fn origin(&self) -> ItineraryOrigin {
        self.origin
    }

    pub fn status(&self) -> ItineraryStatus {
        self.status
    }

    /// Any status may follow any other.
    pub fn set_status(&mut self, status: ItineraryStatus) {
        self.status = status;
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    pub fn total_price(&self) -> Decimal {
        self.total_price
    }

    pub fn deposit_amount(&self) -> Decimal {
        self.deposit_amount
    }

    pub fn balance_due(&self) -> Decimal {
        balance_due(self.total_price, self.deposit_amount)
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn set_currency(&mut self, currency: impl Into<String>) -> Result<()> {
        let currency = currency.into();
        validate_currency_code("currency", &currency)?;
        self.currency = currency;
        Ok(())
    }

    /// Updates price fields. When either value actually changes the payment
    /// status is recomputed, replacing any manual override. Unchanged inputs
    /// leave the aggregate untouched and return `false`.
    pub fn set_pricing(
        &mut self,
        total: Option<Decimal>,
        deposit: Option<Decimal>,
    ) -> Result<bool> {
        let total = total.unwrap_or(self.total_price);
        let deposit = deposit.unwrap_or(self.deposit_amount);
        validate_non_negative_amount("total_price", total)?;
        validate_non_negative_amount("deposit_amount", deposit)?;

        if total == self.total_price && deposit == self.deposit_amount {
            return Ok(false);
        }

        self.total_price = total;
        self.deposit_amount = deposit;
        self.payment_status = derive_payment_status(total, deposit);
        Ok(true)
    }

    /// Manual override. Survives every edit except a price change.
    pub fn override_payment_status(&mut self, status: PaymentStatus) {
        self.payment_status = status;
    }

    /// The status price fields alone would produce.
    pub fn computed_payment_status(&self) -> PaymentStatus {
        derive_payment_status(self.total_price, self.deposit_amount)
    }

    pub fn departure_date(&self) -> Option<NaiveDate> {
        self.departure_date
    }

    pub fn set_departure_date(&mut self, date: Option<NaiveDate>) -> Result<()> {
        check_date_order(date, self.return_date)?;
        self.departure_date = date;
        Ok(())
    }

    /// `None` falls back to the derived return date.
    pub fn set_return_date(&mut self, date: Option<NaiveDate>) -> Result<()> {
        check_date_order(self.departure_date, date)?;
        self.return_date = date;
        Ok(())
    }

    pub fn explicit_return_date(&self) -> Option<NaiveDate> {
        self.return_date
    }

    /// Explicit return date, else departure + duration - 1.
    pub fn effective_return_date(&self) -> Option<NaiveDate> {
        self.return_date.or_else(|| {
            let span = self.schedule.len().saturating_sub(1) as u64;
            self.departure_date
                .and_then(|departure| departure.checked_add_days(Days::new(span)))
        })
    }

    pub fn schedule(&self) -> &DaySchedule {
        &self.schedule
    }

    pub fn schedule_mut(&mut self) -> &mut DaySchedule {
        &mut self.schedule
    }

    pub fn days(&self) -> &[Day] {
        self.schedule.days()
    }

    pub fn number_of_days(&self) -> u32 {
        self.schedule.len() as u32
    }

    pub fn travelers(&self) -> &[Traveler] {
        &self.travelers
    }

    pub fn primary_traveler(&self) -> Option<&Traveler> {
        self.travelers.iter().find(|t| t.is_primary)
    }

    /// The first traveler becomes primary. Adding a traveler flagged primary
    /// moves the flag to them.
    pub fn add_traveler(&mut self, mut traveler: Traveler) -> Result<TravelerId> {
        validate_non_empty_string("full_name", &traveler.full_name)?;
        if self.travelers.iter().any(|t| t.id == traveler.id) {
            return Err(EngineError::conflict(format!(
                "traveler {} is already on itinerary {}",
                traveler.id, self.id
            )));
        }

        if self.travelers.is_empty() {
            traveler.is_primary = true;
        } else if traveler.is_primary {
            for existing in &mut self.travelers {
                existing.is_primary = false;
            }
        }
        let id = traveler.id;
        self.travelers.push(traveler);
        Ok(id)
    }

    /// Removing the primary traveler promotes the next one in list order.
    pub fn remove_traveler(&mut self, id: TravelerId) -> Result<Traveler> {
        let index = self
            .travelers
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| EngineError::not_found("Traveler", id))?;
        let removed = self.travelers.remove(index);
        if removed.is_primary {
            if let Some(next) = self.travelers.first_mut() {
                next.is_primary = true;
            }
        }
        Ok(removed)
    }

    pub fn set_primary_traveler(&mut self, id: TravelerId) -> Result<()> {
        if !self.travelers.iter().any(|t| t.id == id) {
            return Err(EngineError::not_found("Traveler", id));
        }
        for traveler in &mut self.travelers {
            traveler.is_primary = traveler.id == id;
        }
        Ok(())
    }

    pub fn selections(&self) -> &Selections {
        &self.selections
    }

    pub fn selections_mut(&mut self) -> &mut Selections {
        &mut self.selections
    }

    pub fn has_selected(&self, kind: CatalogKind, id: CatalogItemId) -> bool {
        self.selections.ids(kind).contains(&id)
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Validate for Itinerary {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("title", &self.title)?;
        validate_currency_code("currency", &self.currency)?;
        validate_non_negative_amount("total_price", self.total_price)?;
        validate_non_negative_amount("deposit_amount", self.deposit_amount)?;
        check_date_order(self.departure_date, self.return_date)?;

        if !self.schedule.is_contiguous() || self.schedule.is_empty() {
            return Err(EngineError::validation(
                "days",
                "day numbers must run 1..N with at least one day",
            ));
        }

        let primaries = self.travelers.iter().filter(|t| t.is_primary).count();
        if !self.travelers.is_empty() && primaries != 1 {
            return Err(EngineError::validation(
                "travelers",
                format!("exactly one primary traveler required, found {}", primaries),
            ));
        }
        Ok(())
    }
}

fn check_date_order(departure: Option<NaiveDate>, return_date: Option<NaiveDate>) -> Result<()> {
    if let (Some(departure), Some(return_date)) = (departure, return_date) {
        if return_date < departure {
            return Err(EngineError::validation(
                "return_date",
                format!("return date {} is before departure {}", return_date, departure),
            ));
        }
    }
    Ok(())
}

/// Reusable trip template. Itineraries clone it; later template edits never
/// reach existing itineraries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tour {
    pub id: TourId,
    pub version: u64,
    name: String,
    pub summary: String,
    base_price: Decimal,
    currency: String,
    schedule: DaySchedule,
    selections: Selections,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tour {
    pub fn new(
        name: impl Into<String>,
        currency: impl Into<String>,
        number_of_days: u32,
        rules: &ScheduleRules,
    ) -> Result<Self> {
        let name = name.into();
        let currency = currency.into();
        validate_non_empty_string("name", &name)?;
        validate_currency_code("currency", &currency)?;

        let now = Utc::now();
        Ok(Self {
            id: TourId::new(),
            version: 0,
            name,
            summary: String::new(),
            base_price: Decimal::ZERO,
            currency,
            schedule: DaySchedule::with_days(number_of_days, rules)?,
            selections: Selections::default(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        validate_non_empty_string("name", &name)?;
        self.name = name;
        Ok(())
    }

    pub fn base_price(&self) -> Decimal {
        self.base_price
    }

    pub fn set_base_price(&mut self, price: Decimal) -> Result<()> {
        validate_non_negative_amount("base_price", price)?;
        self.base_price = price;
        Ok(())
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn schedule(&self) -> &DaySchedule {
        &self.schedule
    }

    pub fn schedule_mut(&mut self) -> &mut DaySchedule {
        &mut self.schedule
    }

    pub fn days(&self) -> &[Day] {
        self.schedule.days()
    }

    pub fn selections(&self) -> &Selections {
        &self.selections
    }

    pub fn selections_mut(&mut self) -> &mut Selections {
        &mut self.selections
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Validate for Tour {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("name", &self.name)?;
        validate_currency_code("currency", &self.currency)?;
        validate_non_negative_amount("base_price", self.base_price)?;
        if !self.schedule.is_contiguous() || self.schedule.is_empty() {
            return Err(EngineError::validation(
                "days",
                "day numbers must run 1..N with at least one day",
            ));
        }
        Ok(())
    }
}
