//! Reference data loaded from TOML: destinations, the combination matrix,
//! default images, the inclusion/exclusion catalog and tour templates.
//! Everything is addressed by name in the file and turned into ids on load.

use crate::config::engine_config::substitute_env_vars;
use crate::core::engine::{EngineStore, ItineraryEngine};
use crate::domain::model::{
    CatalogItem, CatalogItemId, CatalogKind, CombinationEntry, DayPatch, Destination, DestinationId,
    ImageRole, OwnerRef,
};
use crate::utils::error::{EngineError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedData {
    pub destinations: Vec<DestinationSeed>,
    pub combinations: Vec<CombinationSeed>,
    /// Role name -> image URL. Unknown role names are rejected on load.
    pub default_images: BTreeMap<String, String>,
    pub inclusions: Vec<CatalogSeed>,
    pub exclusions: Vec<CatalogSeed>,
    pub tours: Vec<TourSeed>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationSeed {
    pub name: String,
    pub country: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombinationSeed {
    pub from: String,
    /// Omitted for the self-pair of `from`.
    pub to: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub activity: String,
    #[serde(default)]
    pub bidirectional: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSeed {
    pub name: String,
    pub description: Option<String>,
    pub icon_name: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TourSeed {
    pub name: String,
    pub days: u32,
    pub base_price: Option<Decimal>,
    #[serde(default)]
    pub inclusions: Vec<String>,
    #[serde(default)]
    pub exclusions: Vec<String>,
    #[serde(default)]
    pub stops: Vec<StopSeed>,
    #[serde(default)]
    pub images: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopSeed {
    pub day: u32,
    pub destinations: Vec<String>,
}

/// Case-insensitive name lookup for the seeded destinations.
#[derive(Debug, Clone, Default)]
pub struct DestinationDirectory {
    by_name: HashMap<String, Destination>,
}

impl DestinationDirectory {
    pub fn insert(&mut self, destination: Destination) -> Result<()> {
        let key = destination.name.trim().to_lowercase();
        if self.by_name.contains_key(&key) {
            return Err(EngineError::validation(
                "destinations",
                format!("destination '{}' is declared twice", destination.name),
            ));
        }
        self.by_name.insert(key, destination);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&Destination> {
        self.by_name
            .get(&name.trim().to_lowercase())
            .ok_or_else(|| EngineError::not_found("Destination", name))
    }

    pub fn id_of(&self, name: &str) -> Result<DestinationId> {
        self.get(name).map(|d| d.id)
    }

    pub fn ids_of<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<DestinationId>> {
        names.iter().map(|n| self.id_of(n.as_ref())).collect()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

impl SeedData {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = substitute_env_vars(content)?;
        toml::from_str(&processed).map_err(|e| EngineError::ConfigError {
            message: format!("seed TOML parsing error: {}", e),
        })
    }

    /// Pushes the seed through the engine so every invariant applies to it
    /// as it would to interactive edits.
    pub async fn apply<S: EngineStore>(
        &self,
        engine: &ItineraryEngine<S>,
    ) -> Result<DestinationDirectory> {
        let mut directory = DestinationDirectory::default();
        for seed in &self.destinations {
            directory.insert(Destination::new(seed.name.clone(), seed.country.clone()))?;
        }

        for seed in &self.combinations {
            let from = directory.id_of(&seed.from)?;
            let to = seed.to.as_deref().map(|name| directory.id_of(name)).transpose()?;
            engine
                .matrix()
                .upsert(CombinationEntry::new(
                    from,
                    to,
                    seed.description.clone(),
                    seed.activity.clone(),
                    seed.bidirectional,
                ))
                .await?;
        }

        for (role, url) in &self.default_images {
            let role: ImageRole = role.parse()?;
            engine.images().set_default(role, url.clone()).await?;
        }

        let mut catalog_ids = HashMap::new();
        for (kind, field, seeds) in [
            (CatalogKind::Inclusion, "inclusions", &self.inclusions),
            (CatalogKind::Exclusion, "exclusions", &self.exclusions),
        ] {
            for seed in seeds {
                let key = (kind, seed.name.trim().to_lowercase());
                if catalog_ids.contains_key(&key) {
                    return Err(EngineError::validation(
                        field,
                        format!("catalog item '{}' is declared twice", seed.name),
                    ));
                }
                let mut item = CatalogItem::new(kind, seed.name.clone());
                item.description = seed.description.clone();
                item.icon_name = seed.icon_name.clone();
                item.image_url = seed.image_url.clone();
                let item = engine.catalog().create(item).await?;
                catalog_ids.insert(key, item.id);
            }
        }

        for seed in &self.tours {
            self.apply_tour(engine, &directory, &catalog_ids, seed).await?;
        }

        tracing::info!(
            destinations = directory.len(),
            combinations = self.combinations.len(),
            catalog_items = catalog_ids.len(),
            tours = self.tours.len(),
            "seed data loaded"
        );
        Ok(directory)
    }

    async fn apply_tour<S: EngineStore>(
        &self,
        engine: &ItineraryEngine<S>,
        directory: &DestinationDirectory,
        catalog_ids: &HashMap<(CatalogKind, String), CatalogItemId>,
        seed: &TourSeed,
    ) -> Result<()> {
        let tour = engine.create_tour(seed.name.clone(), seed.days).await?;
        let owner = OwnerRef::Tour(tour.id);

        if let Some(price) = seed.base_price {
            engine
                .modify_tour(tour.id, |t| t.set_base_price(price))
                .await?;
        }

        for (kind, names) in [
            (CatalogKind::Inclusion, &seed.inclusions),
            (CatalogKind::Exclusion, &seed.exclusions),
        ] {
            for name in names {
                let id = catalog_ids
                    .get(&(kind, name.trim().to_lowercase()))
                    .ok_or_else(|| EngineError::not_found("Catalog item", name))?;
                engine.select_item(owner, *id).await?;
            }
        }

        for stop in &seed.stops {
            let patch = DayPatch {
                destination_ids: Some(directory.ids_of(&stop.destinations)?),
                ..Default::default()
            };
            engine.update_day(owner, stop.day, patch).await?;
            engine.auto_fill_day(owner, stop.day).await?;
        }

        for (role, url) in &seed.images {
            engine.set_image(owner, role.parse()?, url.clone()).await?;
        }
        Ok(())
    }
}
