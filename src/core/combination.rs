//! Destination combination matrix: narrative content keyed by destination
//! pairs, resolved for a single pair or chained across a multi-stop day.

use crate::domain::model::{
    CombinationContent, CombinationEntry, DestinationId, PairKey, ResolveMode,
};
use crate::domain::ports::CombinationStore;
use crate::utils::error::{EngineError, Result};
use std::collections::HashMap;
use std::sync::Arc;

pub const DEFAULT_CHAIN_JOINER: &str = "\n\n";

/// Ordered `(from, to)` traversals a resolution has to look up.
fn traversals(
    destination_ids: &[DestinationId],
    mode: ResolveMode,
) -> Result<Vec<(DestinationId, DestinationId)>> {
    match mode {
        ResolveMode::Pair => match destination_ids {
            [from, to] => Ok(vec![(*from, *to)]),
            _ => Err(EngineError::validation(
                "destination_ids",
                format!(
                    "pair resolution needs exactly two destinations, got {}",
                    destination_ids.len()
                ),
            )),
        },
        ResolveMode::Chain => match destination_ids {
            [] => Ok(Vec::new()),
            [only] => Ok(vec![(*only, *only)]),
            _ => Ok(destination_ids.windows(2).map(|w| (w[0], w[1])).collect()),
        },
    }
}

/// Storage keys needed to resolve the given sequence, deduplicated.
pub fn required_keys(destination_ids: &[DestinationId], mode: ResolveMode) -> Result<Vec<PairKey>> {
    let mut keys: Vec<PairKey> = traversals(destination_ids, mode)?
        .into_iter()
        .map(|(from, to)| PairKey::between(from, to))
        .collect();
    keys.sort();
    keys.dedup();
    Ok(keys)
}

/// Resolves content against already-loaded entries. Pairs without a matching
/// entry, or whose entry is one-way in the other direction, are skipped.
pub fn resolve_from(
    entries: &HashMap<PairKey, CombinationEntry>,
    destination_ids: &[DestinationId],
    mode: ResolveMode,
    joiner: &str,
) -> Result<CombinationContent> {
    let mut descriptions = Vec::new();
    let mut activities = Vec::new();

    for (from, to) in traversals(destination_ids, mode)? {
        let Some(content) = entries
            .get(&PairKey::between(from, to))
            .and_then(|entry| entry.content_for(from, to))
        else {
            tracing::debug!(%from, %to, "no combination content for traversal");
            continue;
        };
        descriptions.extend(content.description);
        activities.extend(content.activity);
    }

    Ok(CombinationContent {
        description: join_non_empty(descriptions, joiner),
        activity: join_non_empty(activities, joiner),
    })
}

fn join_non_empty(parts: Vec<String>, joiner: &str) -> Option<String> {
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(joiner))
    }
}

pub struct CombinationMatrix<S: CombinationStore> {
    store: Arc<S>,
    joiner: String,
}

impl<S: CombinationStore> CombinationMatrix<S> {
    pub fn new(store: Arc<S>, joiner: impl Into<String>) -> Self {
        Self {
            store,
            joiner: joiner.into(),
        }
    }

    /// Creates the entry for its pair, or overwrites the content of the one
    /// that already exists. There is never more than one entry per pair.
    pub async fn upsert(&self, entry: CombinationEntry) -> Result<CombinationEntry> {
        if entry.description.trim().is_empty() && entry.activity.trim().is_empty() {
            return Err(EngineError::validation(
                "description",
                "a combination needs a description or an activity",
            ));
        }
        let key = entry.key();
        let stored = self.store.upsert_combination(entry).await?;
        tracing::info!(
            pair = %key,
            entry_id = %stored.id,
            bidirectional = stored.bidirectional,
            "combination stored"
        );
        Ok(stored)
    }

    pub async fn get(
        &self,
        a: DestinationId,
        b: Option<DestinationId>,
    ) -> Result<CombinationEntry> {
        let key = PairKey::new(a, b);
        self.store
            .find_combination(key)
            .await?
            .ok_or_else(|| EngineError::not_found("Combination", key))
    }

    pub async fn delete(&self, a: DestinationId, b: Option<DestinationId>) -> Result<()> {
        let key = PairKey::new(a, b);
        self.store.delete_combination(key).await?;
        tracing::info!(pair = %key, "combination deleted");
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<CombinationEntry>> {
        self.store.list_combinations().await
    }

    /// Resolves content for an ordered destination sequence. Missing content
    /// is an empty result, not an error.
    pub async fn resolve(
        &self,
        destination_ids: &[DestinationId],
        mode: ResolveMode,
    ) -> Result<CombinationContent> {
        let mut entries = HashMap::new();
        for key in required_keys(destination_ids, mode)? {
            if let Some(entry) = self.store.find_combination(key).await? {
                entries.insert(key, entry);
            }
        }

        let content = resolve_from(&entries, destination_ids, mode, &self.joiner)?;
        tracing::debug!(
            stops = destination_ids.len(),
            matched = entries.len(),
            empty = content.is_empty(),
            "resolved combination content"
        );
        Ok(content)
    }
}
