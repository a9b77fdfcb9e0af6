use crate::utils::error::{EngineError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

entity_id!(
    /// Opaque reference into the destination subsystem; never validated here.
    DestinationId
);
entity_id!(
    /// Opaque reference into the accommodation subsystem.
    AccommodationId
);
entity_id!(ItineraryId);
entity_id!(TourId);
entity_id!(CatalogItemId);
entity_id!(CombinationId);
entity_id!(TravelerId);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    pub id: DestinationId,
    pub name: String,
    pub country: String,
}

impl Destination {
    pub fn new(name: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            id: DestinationId::new(),
            name: name.into(),
            country: country.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Combination matrix
// ---------------------------------------------------------------------------

/// Order-independent storage key for a destination pair.
///
/// A self-pair (the diagonal of the matrix) has `low == high`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey {
    low: DestinationId,
    high: DestinationId,
}

impl PairKey {
    pub fn new(a: DestinationId, b: Option<DestinationId>) -> Self {
        let b = b.unwrap_or(a);
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }

    pub fn between(from: DestinationId, to: DestinationId) -> Self {
        Self::new(from, Some(to))
    }

    pub fn is_self_pair(&self) -> bool {
        self.low == self.high
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}, {}}}", self.low, self.high)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinationEntry {
    pub id: CombinationId,
    pub destination_a: DestinationId,
    /// `None` marks the self-pair of `destination_a`.
    pub destination_b: Option<DestinationId>,
    pub description: String,
    pub activity: String,
    pub bidirectional: bool,
    pub updated_at: DateTime<Utc>,
}

impl CombinationEntry {
    pub fn new(
        destination_a: DestinationId,
        destination_b: Option<DestinationId>,
        description: impl Into<String>,
        activity: impl Into<String>,
        bidirectional: bool,
    ) -> Self {
        Self {
            id: CombinationId::new(),
            destination_a,
            destination_b: destination_b.filter(|b| *b != destination_a),
            description: description.into(),
            activity: activity.into(),
            bidirectional,
            updated_at: Utc::now(),
        }
    }

    pub fn key(&self) -> PairKey {
        PairKey::new(self.destination_a, self.destination_b)
    }

    pub fn is_self_pair(&self) -> bool {
        self.destination_b.is_none()
    }

    /// Content for a traversal `from -> to`. A one-way entry only answers in
    /// its stored `A -> B` order.
    pub fn content_for(
        &self,
        from: DestinationId,
        to: DestinationId,
    ) -> Option<CombinationContent> {
        let stored_to = self.destination_b.unwrap_or(self.destination_a);
        let forward = from == self.destination_a && to == stored_to;
        let backward = from == stored_to && to == self.destination_a;

        if forward || (backward && self.bidirectional) {
            Some(self.content())
        } else {
            None
        }
    }

    pub fn content(&self) -> CombinationContent {
        CombinationContent {
            description: non_blank(&self.description),
            activity: non_blank(&self.activity),
        }
    }

    /// Takes over the content and orientation of a duplicate write for the
    /// same pair, keeping this entry's identity.
    pub fn absorb(&mut self, incoming: CombinationEntry) {
        self.destination_a = incoming.destination_a;
        self.destination_b = incoming.destination_b;
        self.description = incoming.description;
        self.activity = incoming.activity;
        self.bidirectional = incoming.bidirectional;
        self.updated_at = incoming.updated_at;
    }
}

/// Whitespace-only text counts as no text. Anything else is returned as
/// stored, indentation and trailing newlines included.
fn non_blank(value: &str) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinationContent {
    pub description: Option<String>,
    pub activity: Option<String>,
}

impl CombinationContent {
    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.activity.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveMode {
    Pair,
    Chain,
}

impl FromStr for ResolveMode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pair" => Ok(Self::Pair),
            "chain" => Ok(Self::Chain),
            other => Err(EngineError::validation(
                "mode",
                format!("unknown resolve mode '{}', expected 'pair' or 'chain'", other),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Days
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Day {
    pub day_number: u32,
    pub title: String,
    pub description: String,
    pub activities: String,
    pub meals_included: String,
    pub destination_ids: Vec<DestinationId>,
    pub accommodation_id: Option<AccommodationId>,
    pub atmospheric_image_url: Option<String>,
    #[serde(default)]
    pub is_description_custom: bool,
    #[serde(default)]
    pub is_activity_custom: bool,
}

impl Day {
    pub fn placeholder(day_number: u32, title: String) -> Self {
        Self {
            day_number,
            title,
            description: String::new(),
            activities: String::new(),
            meals_included: String::new(),
            destination_ids: Vec::new(),
            accommodation_id: None,
            atmospheric_image_url: None,
            is_description_custom: false,
            is_activity_custom: false,
        }
    }
}

/// Human edit of a day. `None` leaves a field untouched; for the nullable
/// references `Some(None)` clears them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DayPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub activities: Option<String>,
    pub meals_included: Option<String>,
    pub destination_ids: Option<Vec<DestinationId>>,
    pub accommodation_id: Option<Option<AccommodationId>>,
    pub atmospheric_image_url: Option<Option<String>>,
}

/// What an auto-fill call did to a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoFillOutcome {
    /// No destinations, or no matrix entry matched any of them.
    NoContentFound,
    Applied {
        description_updated: bool,
        activity_updated: bool,
    },
}

// ---------------------------------------------------------------------------
// Image slots
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageRole {
    Cover,
    AccommodationEnd,
    Inclusions,
    AboutBanner,
    End,
}

impl ImageRole {
    pub const ALL: [ImageRole; 5] = [
        ImageRole::Cover,
        ImageRole::AccommodationEnd,
        ImageRole::Inclusions,
        ImageRole::AboutBanner,
        ImageRole::End,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cover => "cover",
            Self::AccommodationEnd => "accommodation_end",
            Self::Inclusions => "inclusions",
            Self::AboutBanner => "about_banner",
            Self::End => "end",
        }
    }
}

impl fmt::Display for ImageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageRole {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| {
                EngineError::validation("role", format!("unrecognized image role '{}'", s))
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum OwnerRef {
    Itinerary(ItineraryId),
    Tour(TourId),
}

impl fmt::Display for OwnerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Itinerary(id) => write!(f, "itinerary:{}", id),
            Self::Tour(id) => write!(f, "tour:{}", id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSlot {
    pub owner: OwnerRef,
    pub role: ImageRole,
    pub image_url: String,
    pub updated_at: DateTime<Utc>,
}

/// Effective image for a role after applying the fallback tiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", content = "url", rename_all = "snake_case")]
pub enum ResolvedImage {
    Explicit(String),
    Default(String),
    Absent,
}

impl ResolvedImage {
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Explicit(url) | Self::Default(url) => Some(url),
            Self::Absent => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

// ---------------------------------------------------------------------------
// Inclusion / exclusion catalog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogKind {
    Inclusion,
    Exclusion,
}

impl fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inclusion => f.write_str("inclusion"),
            Self::Exclusion => f.write_str("exclusion"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: CatalogItemId,
    pub kind: CatalogKind,
    pub name: String,
    pub description: Option<String>,
    pub icon_name: Option<String>,
    pub image_url: Option<String>,
}

impl CatalogItem {
    pub fn new(kind: CatalogKind, name: impl Into<String>) -> Self {
        Self {
            id: CatalogItemId::new(),
            kind,
            name: name.into(),
            description: None,
            icon_name: None,
            image_url: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Itinerary state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItineraryStatus {
    #[default]
    Draft,
    UnderReview,
    Sent,
    Confirmed,
    Completed,
    Cancelled,
}

impl FromStr for ItineraryStatus {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "draft" => Ok(Self::Draft),
            "under_review" => Ok(Self::UnderReview),
            "sent" => Ok(Self::Sent),
            "confirmed" => Ok(Self::Confirmed),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(EngineError::validation(
                "status",
                format!("unrecognized itinerary status '{}'", other),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    NotPaid,
    PartiallyPaid,
    FullyPaid,
    /// Only ever set by an explicit override, never derived.
    Custom,
}

impl FromStr for PaymentStatus {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "not_paid" => Ok(Self::NotPaid),
            "partially_paid" => Ok(Self::PartiallyPaid),
            "fully_paid" => Ok(Self::FullyPaid),
            "custom" => Ok(Self::Custom),
            other => Err(EngineError::validation(
                "payment_status",
                format!("unrecognized payment status '{}'", other),
            )),
        }
    }
}

/// How an itinerary came to exist. Recorded only; it never changes behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ItineraryOrigin {
    FromTour { tour_id: TourId },
    FromTourEdited { tour_id: TourId },
    Scratch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Traveler {
    pub id: TravelerId,
    pub full_name: String,
    pub email: Option<String>,
    pub is_primary: bool,
}

impl Traveler {
    pub fn new(full_name: impl Into<String>) -> Self {
        Self {
            id: TravelerId::new(),
            full_name: full_name.into(),
            email: None,
            is_primary: false,
        }
    }
}
