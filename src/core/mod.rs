pub mod catalog;
pub mod combination;
pub mod engine;
pub mod image_slots;
pub mod itinerary;
pub mod payment;
pub mod schedule;

pub use crate::domain::model::*;
pub use crate::domain::ports::{
    CatalogStore, CombinationStore, DefaultImageRegistry, ImageSlotStore, ItineraryStore,
    TourStore,
};
pub use crate::utils::error::Result;
