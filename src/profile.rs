use crate::cache::NormalizedCache;
use crate::github::GitHubApi;
use crate::models::EntityId;
use crate::repository_item::RepositoryItem;
use crate::types::ViewerData;
use std::sync::Arc;
use tracing::{debug, error, info};

pub const DEFAULT_FIRST: u32 = 5;

/// What the profile view shows. Exactly one state at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileRender {
    Error(String),
    Loading,
    List(Vec<EntityId>),
}

/// Lifecycle of the viewer repositories query
#[derive(Debug, Clone, Default)]
pub struct QueryState {
    pub loading: bool,
    pub error: Option<String>,
    /// Repository identities of the viewer, `None` until a viewer record arrives
    pub viewer: Option<Vec<EntityId>>,
}

impl QueryState {
    /// Error wins over everything, then loading or a missing viewer, then the list
    pub fn render(&self) -> ProfileRender {
        if let Some(error) = &self.error {
            return ProfileRender::Error(error.clone());
        }
        match &self.viewer {
            Some(repositories) if !self.loading => ProfileRender::List(repositories.clone()),
            _ => ProfileRender::Loading,
        }
    }
}

/// Owns the listing query and the row controllers built from its result
pub struct ProfileController {
    api: Arc<dyn GitHubApi>,
    cache: Arc<NormalizedCache>,
    first: u32,
    state: QueryState,
    items: Vec<RepositoryItem>,
}

impl ProfileController {
    pub fn new(api: Arc<dyn GitHubApi>, cache: Arc<NormalizedCache>, first: u32) -> Self {
        Self {
            api,
            cache,
            first,
            state: QueryState::default(),
            items: Vec::new(),
        }
    }

    pub fn state(&self) -> &QueryState {
        &self.state
    }

    pub fn render(&self) -> ProfileRender {
        self.state.render()
    }

    pub fn cache(&self) -> &Arc<NormalizedCache> {
        &self.cache
    }

    pub fn items(&self) -> &[RepositoryItem] {
        &self.items
    }

    pub fn item(&self, id: &EntityId) -> Option<&RepositoryItem> {
        self.items.iter().find(|item| item.id() == id)
    }

    /// Find a row by node id, cache identity or repository name
    pub fn find_item(&self, needle: &str) -> Option<&RepositoryItem> {
        self.items.iter().find(|item| {
            item.id().node_id() == needle
                || item.id().as_str() == needle
                || item.repository().is_some_and(|r| r.name == needle)
        })
    }

    /// Issue the listing query and normalize the result into the cache
    pub async fn load(&mut self) -> &QueryState {
        self.state.loading = true;
        self.state.error = None;
        debug!(first = self.first, "Loading viewer repositories");

        match self.api.viewer_repositories(self.first).await {
            Ok(response) => {
                if let Some(data) = response.data.as_ref() {
                    self.normalize(data);
                }
                if let Some(message) = response.error_message() {
                    error!("Viewer repositories query returned errors: {}", message);
                    self.state.error = Some(message);
                }
            }
            Err(e) => {
                error!("Viewer repositories query failed: {}", e);
                self.state.error = Some(e.to_string());
            }
        }

        self.state.loading = false;
        &self.state
    }

    fn normalize(&mut self, data: &ViewerData) {
        let Some(viewer) = &data.viewer else {
            self.state.viewer = None;
            self.items.clear();
            return;
        };

        let ids: Vec<EntityId> = viewer
            .repositories
            .nodes()
            .map(|node| self.cache.write_entity(node.clone()))
            .collect();

        info!(repositories = ids.len(), "Viewer repositories loaded");

        self.items = ids
            .iter()
            .map(|id| RepositoryItem::new(id.clone(), self.api.clone(), self.cache.clone()))
            .collect();
        self.state.viewer = Some(ids);
    }
}
