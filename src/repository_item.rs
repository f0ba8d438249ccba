use crate::cache::{NormalizedCache, RepositoryPatch};
use crate::error::{GitHubProfileError, Result};
use crate::github::GitHubApi;
use crate::models::{EntityId, Repository, SubscriptionState};
use crate::types::{StarPayload, SubscriptionPayload};
use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

/// In-flight keys for a repository row. Star and unstar flip the same flag and
/// share one key, so at most one of them is outstanding at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemAction {
    StarToggle,
    WatchToggle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StarAction {
    Star,
    Unstar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchAction {
    Watch,
    Unwatch,
}

/// Actions currently offered for a row, derived from cached state only
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OfferedActions {
    pub star: StarAction,
    pub watch: WatchAction,
}

impl OfferedActions {
    pub fn for_repository(repository: &Repository) -> Self {
        Self {
            star: if repository.viewer_has_starred {
                StarAction::Unstar
            } else {
                StarAction::Star
            },
            watch: if repository.is_watching() {
                WatchAction::Unwatch
            } else {
                WatchAction::Watch
            },
        }
    }
}

/// Mutation controller for one repository row.
///
/// Every action layers an optimistic patch on the shared cache before the
/// request goes out, then either commits the confirmed patch or rolls the
/// layer back. An action that is already outstanding is rejected.
pub struct RepositoryItem {
    id: EntityId,
    api: Arc<dyn GitHubApi>,
    cache: Arc<NormalizedCache>,
    in_flight: Mutex<HashSet<ItemAction>>,
}

struct InFlightGuard<'a> {
    in_flight: &'a Mutex<HashSet<ItemAction>>,
    action: ItemAction,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.action);
    }
}

impl RepositoryItem {
    pub fn new(id: EntityId, api: Arc<dyn GitHubApi>, cache: Arc<NormalizedCache>) -> Self {
        Self {
            id,
            api,
            cache,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn id(&self) -> &EntityId {
        &self.id
    }

    /// Current cached record, optimistic layers included
    pub fn repository(&self) -> Option<Repository> {
        self.cache.read(&self.id)
    }

    pub fn offered_actions(&self) -> Result<OfferedActions> {
        Ok(OfferedActions::for_repository(&self.current()?))
    }

    pub fn is_in_flight(&self, action: ItemAction) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&action)
    }

    fn current(&self) -> Result<Repository> {
        self.cache
            .read(&self.id)
            .ok_or_else(|| GitHubProfileError::NotFound(self.id.to_string()))
    }

    fn begin(&self, action: ItemAction) -> Result<InFlightGuard<'_>> {
        let inserted = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(action);
        if !inserted {
            return Err(GitHubProfileError::MutationInFlight(format!(
                "{:?} on {}",
                action, self.id
            )));
        }
        Ok(InFlightGuard {
            in_flight: &self.in_flight,
            action,
        })
    }

    /// Star the repository; only offered while `viewerHasStarred` is false
    pub async fn star(&self) -> Result<Repository> {
        let _in_flight = self.begin(ItemAction::StarToggle)?;
        let repository = self.current()?;
        if repository.viewer_has_starred {
            return Err(GitHubProfileError::ActionUnavailable(format!(
                "{} is already starred",
                self.id
            )));
        }

        let patch = RepositoryPatch::starred(true);
        self.dispatch(
            ItemAction::StarToggle,
            patch,
            self.api.add_star(&repository.id),
            |payload: StarPayload| (EntityId::repository(&payload.starrable.id), patch),
        )
        .await
    }

    /// Unstar the repository; only offered while `viewerHasStarred` is true
    pub async fn unstar(&self) -> Result<Repository> {
        let _in_flight = self.begin(ItemAction::StarToggle)?;
        let repository = self.current()?;
        if !repository.viewer_has_starred {
            return Err(GitHubProfileError::ActionUnavailable(format!(
                "{} is not starred",
                self.id
            )));
        }

        let patch = RepositoryPatch::starred(false);
        self.dispatch(
            ItemAction::StarToggle,
            patch,
            self.api.remove_star(&repository.id),
            |payload: StarPayload| (EntityId::repository(&payload.starrable.id), patch),
        )
        .await
    }

    /// Flip SUBSCRIBED <-> UNSUBSCRIBED with a single updateSubscription call
    pub async fn toggle_watch(&self) -> Result<Repository> {
        let _in_flight = self.begin(ItemAction::WatchToggle)?;
        let repository = self.current()?;
        let target = SubscriptionState::toggle_target(repository.viewer_subscription);

        self.dispatch(
            ItemAction::WatchToggle,
            RepositoryPatch::subscription(target),
            self.api.update_subscription(&repository.id, target),
            |payload: SubscriptionPayload| {
                let confirmed = payload.subscribable.viewer_subscription.unwrap_or(target);
                (
                    EntityId::repository(&payload.subscribable.id),
                    RepositoryPatch::subscription(confirmed),
                )
            },
        )
        .await
    }

    async fn dispatch<T, F>(
        &self,
        action: ItemAction,
        optimistic_patch: RepositoryPatch,
        request: F,
        confirm: impl FnOnce(T) -> (EntityId, RepositoryPatch),
    ) -> Result<Repository>
    where
        F: Future<Output = Result<T>>,
    {
        let optimistic = self.cache.record_optimistic(&self.id, optimistic_patch)?;

        match request.await {
            Ok(payload) => {
                let (confirmed_id, patch) = confirm(payload);
                let repository = optimistic.commit(&confirmed_id, patch)?;
                info!(
                    id = %confirmed_id,
                    ?action,
                    stargazers = repository.stargazers.total_count,
                    watchers = repository.watchers.total_count,
                    "Mutation confirmed"
                );
                Ok(repository)
            }
            Err(e) => {
                optimistic.rollback();
                warn!(id = %self.id, ?action, "Mutation failed, optimistic update rolled back: {}", e);
                debug!(id = %self.id, restored = ?self.cache.read(&self.id), "Restored record");
                Err(e)
            }
        }
    }
}
