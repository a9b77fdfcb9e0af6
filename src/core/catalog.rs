//! Shared inclusion/exclusion catalog and the by-reference selections that
//! itineraries and tours hold on it.

use crate::domain::model::{CatalogItem, CatalogItemId, CatalogKind};
use crate::domain::ports::CatalogStore;
use crate::utils::error::{EngineError, Result};
use crate::utils::validation::{validate_non_empty_string, Validate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Catalog ids selected by one owner. Only ids are held, never copies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selections {
    inclusion_ids: BTreeSet<CatalogItemId>,
    exclusion_ids: BTreeSet<CatalogItemId>,
}

impl Selections {
    pub fn ids(&self, kind: CatalogKind) -> &BTreeSet<CatalogItemId> {
        match kind {
            CatalogKind::Inclusion => &self.inclusion_ids,
            CatalogKind::Exclusion => &self.exclusion_ids,
        }
    }

    fn ids_mut(&mut self, kind: CatalogKind) -> &mut BTreeSet<CatalogItemId> {
        match kind {
            CatalogKind::Inclusion => &mut self.inclusion_ids,
            CatalogKind::Exclusion => &mut self.exclusion_ids,
        }
    }

    pub fn contains(&self, id: CatalogItemId) -> bool {
        self.inclusion_ids.contains(&id) || self.exclusion_ids.contains(&id)
    }

    /// Returns `false` when the item was already selected.
    pub fn select(&mut self, kind: CatalogKind, id: CatalogItemId) -> bool {
        self.ids_mut(kind).insert(id)
    }

    pub fn deselect(&mut self, kind: CatalogKind, id: CatalogItemId) -> Result<()> {
        if self.ids_mut(kind).remove(&id) {
            Ok(())
        } else {
            Err(EngineError::not_found("Selected catalog item", id))
        }
    }

    /// Drops the id from both sets; used by catalog deletion.
    pub fn strip(&mut self, id: CatalogItemId) -> bool {
        let included = self.inclusion_ids.remove(&id);
        let excluded = self.exclusion_ids.remove(&id);
        included || excluded
    }

    pub fn is_empty(&self) -> bool {
        self.inclusion_ids.is_empty() && self.exclusion_ids.is_empty()
    }
}

impl Validate for CatalogItem {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("name", &self.name)
    }
}

pub struct Catalog<S: CatalogStore> {
    store: Arc<S>,
}

impl<S: CatalogStore> Catalog<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn create(&self, item: CatalogItem) -> Result<CatalogItem> {
        item.validate()?;
        self.store.insert_item(item.clone()).await?;
        tracing::info!(item_id = %item.id, kind = %item.kind, "catalog item created");
        Ok(item)
    }

    /// Edits are visible to every owner at once since owners hold ids only.
    pub async fn update(&self, item: CatalogItem) -> Result<CatalogItem> {
        item.validate()?;
        let existing = self.store.get_item(item.id).await?;
        if existing.kind != item.kind {
            return Err(EngineError::validation(
                "kind",
                format!("cannot turn an {} into an {}", existing.kind, item.kind),
            ));
        }
        self.store.update_item(item.clone()).await?;
        tracing::debug!(item_id = %item.id, "catalog item updated");
        Ok(item)
    }

    pub async fn get(&self, id: CatalogItemId) -> Result<CatalogItem> {
        self.store.get_item(id).await
    }

    pub async fn list(&self, kind: CatalogKind) -> Result<Vec<CatalogItem>> {
        self.store.list_items(kind).await
    }

    /// Deletes the item and every reference to it as one transaction.
    pub async fn delete(&self, id: CatalogItemId) -> Result<usize> {
        let cleaned = self.store.delete_item_cascade(id).await?;
        tracing::info!(item_id = %id, owners_cleaned = cleaned, "catalog item deleted");
        Ok(cleaned)
    }
}
