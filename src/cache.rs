//! Normalized entity cache shared by the profile view and every repository row.
//!
//! Records live in a base layer holding authoritative data (query results and
//! confirmed mutations). Each in-flight mutation adds an optimistic layer on
//! top that patches one entity; reads see the base record with every layer
//! applied in dispatch order. Settling a mutation drops its layer, so a
//! rollback restores exactly the pre-mutation view while keeping any base
//! writes that landed in the meantime.

use crate::error::{GitHubProfileError, Result};
use crate::models::{EntityId, Repository, SubscriptionState};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::broadcast;
use tracing::{debug, trace};

const EVENT_CAPACITY: usize = 256;

/// Counter movement applied by a patch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountDelta {
    Increment,
    Decrement,
}

impl CountDelta {
    fn apply(self, count: u64) -> u64 {
        match self {
            CountDelta::Increment => count.saturating_add(1),
            CountDelta::Decrement => count.saturating_sub(1),
        }
    }
}

/// Field-level write against a cached repository
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryPatch {
    Star {
        viewer_has_starred: bool,
        delta: CountDelta,
    },
    Subscription {
        viewer_subscription: SubscriptionState,
        delta: CountDelta,
    },
}

impl RepositoryPatch {
    /// Star or unstar: the flag follows `starred`, the count moves with it.
    pub fn starred(starred: bool) -> Self {
        RepositoryPatch::Star {
            viewer_has_starred: starred,
            delta: if starred { CountDelta::Increment } else { CountDelta::Decrement },
        }
    }

    /// Watch toggle: watchers grow only when the new state is SUBSCRIBED.
    pub fn subscription(state: SubscriptionState) -> Self {
        RepositoryPatch::Subscription {
            viewer_subscription: state,
            delta: if state.is_watching() { CountDelta::Increment } else { CountDelta::Decrement },
        }
    }

    pub fn apply(&self, repository: &mut Repository) {
        match *self {
            RepositoryPatch::Star { viewer_has_starred, delta } => {
                repository.viewer_has_starred = viewer_has_starred;
                repository.stargazers.total_count = delta.apply(repository.stargazers.total_count);
            }
            RepositoryPatch::Subscription { viewer_subscription, delta } => {
                repository.viewer_subscription = Some(viewer_subscription);
                repository.watchers.total_count = delta.apply(repository.watchers.total_count);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheEventKind {
    /// Base record written from a query result
    Written,
    /// Speculative patch layered on top
    Optimistic,
    /// Speculative layer dropped and confirmed patch applied to the base
    Committed,
    /// Speculative layer dropped without a confirmed patch
    RolledBack,
}

/// Change notification for views holding an identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEvent {
    pub id: EntityId,
    pub kind: CacheEventKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct LayerId(u64);

#[derive(Debug)]
struct OptimisticLayer {
    layer: LayerId,
    id: EntityId,
    patch: RepositoryPatch,
}

#[derive(Debug, Default)]
struct CacheState {
    entities: HashMap<EntityId, Repository>,
    layers: Vec<OptimisticLayer>,
    next_layer: u64,
}

impl CacheState {
    fn read(&self, id: &EntityId) -> Option<Repository> {
        let mut repository = self.entities.get(id)?.clone();
        for layer in self.layers.iter().filter(|l| &l.id == id) {
            layer.patch.apply(&mut repository);
        }
        Some(repository)
    }

    fn remove_layer(&mut self, layer: LayerId) -> Option<OptimisticLayer> {
        let index = self.layers.iter().position(|l| l.layer == layer)?;
        Some(self.layers.remove(index))
    }
}

/// Session-lifetime store keyed by entity identity
#[derive(Debug)]
pub struct NormalizedCache {
    state: RwLock<CacheState>,
    events: broadcast::Sender<CacheEvent>,
}

impl Default for NormalizedCache {
    fn default() -> Self {
        Self::new()
    }
}

impl NormalizedCache {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: RwLock::new(CacheState::default()),
            events,
        }
    }

    fn state(&self) -> RwLockReadGuard<'_, CacheState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn state_mut(&self) -> RwLockWriteGuard<'_, CacheState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, id: EntityId, kind: CacheEventKind) {
        trace!(%id, ?kind, "cache event");
        // No receivers is fine
        let _ = self.events.send(CacheEvent { id, kind });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.events.subscribe()
    }

    /// Current view of an entity, optimistic layers included
    pub fn read(&self, id: &EntityId) -> Option<Repository> {
        self.state().read(id)
    }

    /// Base record without any optimistic layer
    pub fn read_confirmed(&self, id: &EntityId) -> Option<Repository> {
        self.state().entities.get(id).cloned()
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.state().entities.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.state().entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().entities.is_empty()
    }

    pub fn pending_optimistic(&self) -> usize {
        self.state().layers.len()
    }

    /// Normalize a full record into the base layer, replacing any previous one
    pub fn write_entity(&self, repository: Repository) -> EntityId {
        let id = repository.entity_id();
        self.state_mut().entities.insert(id.clone(), repository);
        self.publish(id.clone(), CacheEventKind::Written);
        id
    }

    /// Apply a patch to the base record of `id`
    pub fn write(&self, id: &EntityId, patch: RepositoryPatch) -> Result<Repository> {
        let repository = {
            let mut state = self.state_mut();
            match state.entities.get_mut(id) {
                Some(base) => patch.apply(base),
                None => return Err(GitHubProfileError::NotFound(id.to_string())),
            }
            state.read(id)
        };
        self.publish(id.clone(), CacheEventKind::Written);
        repository.ok_or_else(|| GitHubProfileError::NotFound(id.to_string()))
    }

    /// Layer a speculative patch over `id` until the returned handle settles.
    /// Dropping the handle unsettled rolls the patch back.
    pub fn record_optimistic(
        &self,
        id: &EntityId,
        patch: RepositoryPatch,
    ) -> Result<OptimisticWrite<'_>> {
        let layer = {
            let mut state = self.state_mut();
            if !state.entities.contains_key(id) {
                return Err(GitHubProfileError::NotFound(id.to_string()));
            }
            let layer = LayerId(state.next_layer);
            state.next_layer += 1;
            state.layers.push(OptimisticLayer {
                layer,
                id: id.clone(),
                patch,
            });
            layer
        };
        debug!(%id, ?patch, "optimistic patch applied");
        self.publish(id.clone(), CacheEventKind::Optimistic);

        Ok(OptimisticWrite {
            cache: self,
            layer,
            id: id.clone(),
            settled: false,
        })
    }

    fn commit_layer(
        &self,
        layer: LayerId,
        confirmed_id: &EntityId,
        patch: RepositoryPatch,
    ) -> Result<Repository> {
        let (dropped, repository) = {
            let mut state = self.state_mut();
            let dropped = state.remove_layer(layer).map(|l| l.id);
            let applied = match state.entities.get_mut(confirmed_id) {
                Some(base) => {
                    patch.apply(base);
                    true
                }
                None => false,
            };
            let repository = if applied { state.read(confirmed_id) } else { None };
            (dropped, repository)
        };

        if let Some(id) = dropped.filter(|id| id != confirmed_id) {
            self.publish(id, CacheEventKind::RolledBack);
        }
        match repository {
            Some(repository) => {
                self.publish(confirmed_id.clone(), CacheEventKind::Committed);
                Ok(repository)
            }
            None => Err(GitHubProfileError::NotFound(confirmed_id.to_string())),
        }
    }

    fn rollback_layer(&self, layer: LayerId) {
        let dropped = self.state_mut().remove_layer(layer);
        if let Some(dropped) = dropped {
            debug!(id = %dropped.id, patch = ?dropped.patch, "optimistic patch rolled back");
            self.publish(dropped.id, CacheEventKind::RolledBack);
        }
    }
}

/// Handle to an optimistic layer awaiting the server's answer
#[derive(Debug)]
#[must_use = "dropping an optimistic write rolls it back"]
pub struct OptimisticWrite<'a> {
    cache: &'a NormalizedCache,
    layer: LayerId,
    id: EntityId,
    settled: bool,
}

impl OptimisticWrite<'_> {
    pub fn id(&self) -> &EntityId {
        &self.id
    }

    /// Drop the speculative layer and apply `patch` to the confirmed
    /// identity's current base value.
    pub fn commit(mut self, confirmed_id: &EntityId, patch: RepositoryPatch) -> Result<Repository> {
        self.settled = true;
        self.cache.commit_layer(self.layer, confirmed_id, patch)
    }

    pub fn rollback(mut self) {
        self.settled = true;
        self.cache.rollback_layer(self.layer);
    }
}

impl Drop for OptimisticWrite<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.cache.rollback_layer(self.layer);
        }
    }
}
