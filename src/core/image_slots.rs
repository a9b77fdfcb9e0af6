//! Named image slots per owner with a company-wide default tier.

use crate::domain::model::{ImageRole, ImageSlot, OwnerRef, ResolvedImage};
use crate::domain::ports::{DefaultImageRegistry, ImageSlotStore};
use crate::utils::error::Result;
use crate::utils::validation::validate_non_empty_string;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;

pub struct ImageSlotManager<S, D>
where
    S: ImageSlotStore,
    D: DefaultImageRegistry,
{
    slots: Arc<S>,
    defaults: Arc<D>,
}

impl<S, D> ImageSlotManager<S, D>
where
    S: ImageSlotStore,
    D: DefaultImageRegistry,
{
    pub fn new(slots: Arc<S>, defaults: Arc<D>) -> Self {
        Self { slots, defaults }
    }

    /// Upsert: replaces whatever the owner had in this role.
    pub async fn set_slot(
        &self,
        owner: OwnerRef,
        role: ImageRole,
        image_url: impl Into<String>,
    ) -> Result<ImageSlot> {
        let image_url = image_url.into();
        validate_non_empty_string("image_url", &image_url)?;

        let slot = ImageSlot {
            owner,
            role,
            image_url,
            updated_at: Utc::now(),
        };
        self.slots.put_slot(slot.clone()).await?;
        tracing::info!(%owner, %role, "image slot set");
        Ok(slot)
    }

    /// Removes the explicit slot only; the default for the role is untouched.
    pub async fn clear_slot(&self, owner: OwnerRef, role: ImageRole) -> Result<()> {
        self.slots.remove_slot(owner, role).await?;
        tracing::info!(%owner, %role, "image slot cleared");
        Ok(())
    }

    /// Explicit slot, then the registered default, then absent.
    pub async fn resolve(&self, owner: OwnerRef, role: ImageRole) -> Result<ResolvedImage> {
        if let Some(slot) = self.slots.get_slot(owner, role).await? {
            return Ok(ResolvedImage::Explicit(slot.image_url));
        }
        let resolved = match self.defaults.get_default(role).await? {
            Some(url) => ResolvedImage::Default(url),
            None => ResolvedImage::Absent,
        };
        tracing::debug!(%owner, %role, absent = resolved.is_absent(), "image slot fell through");
        Ok(resolved)
    }

    pub async fn resolve_all(&self, owner: OwnerRef) -> Result<BTreeMap<ImageRole, ResolvedImage>> {
        let explicit: BTreeMap<ImageRole, String> = self
            .slots
            .list_slots(owner)
            .await?
            .into_iter()
            .map(|slot| (slot.role, slot.image_url))
            .collect();

        let mut resolved = BTreeMap::new();
        for role in ImageRole::ALL {
            let image = match explicit.get(&role) {
                Some(url) => ResolvedImage::Explicit(url.clone()),
                None => match self.defaults.get_default(role).await? {
                    Some(url) => ResolvedImage::Default(url),
                    None => ResolvedImage::Absent,
                },
            };
            resolved.insert(role, image);
        }
        Ok(resolved)
    }

    /// Copies every explicit slot of one owner onto another, overwriting.
    pub async fn copy_slots(&self, from: OwnerRef, to: OwnerRef) -> Result<usize> {
        let slots = self.slots.list_slots(from).await?;
        let copied = slots.len();
        for slot in slots {
            self.slots
                .put_slot(ImageSlot {
                    owner: to,
                    updated_at: Utc::now(),
                    ..slot
                })
                .await?;
        }
        tracing::debug!(%from, %to, copied, "image slots copied");
        Ok(copied)
    }

    pub async fn set_default(&self, role: ImageRole, image_url: impl Into<String>) -> Result<()> {
        let image_url = image_url.into();
        validate_non_empty_string("image_url", &image_url)?;
        self.defaults.set_default(role, image_url).await?;
        tracing::info!(%role, "default image registered");
        Ok(())
    }

    pub async fn remove_default(&self, role: ImageRole) -> Result<()> {
        self.defaults.remove_default(role).await?;
        tracing::info!(%role, "default image removed");
        Ok(())
    }
}
