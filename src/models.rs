use serde::{Deserialize, Serialize};
use std::fmt;

pub const REPOSITORY_TYPENAME: &str = "Repository";

/// Normalized cache key, `<Typename>:<node id>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(typename: &str, node_id: &str) -> Self {
        Self(format!("{}:{}", typename, node_id))
    }

    pub fn repository(node_id: &str) -> Self {
        Self::new(REPOSITORY_TYPENAME, node_id)
    }

    pub fn typename(&self) -> &str {
        self.0.split_once(':').map(|(typename, _)| typename).unwrap_or_default()
    }

    /// The GraphQL node id, as sent back to the API in mutation inputs
    pub fn node_id(&self) -> &str {
        self.0.split_once(':').map(|(_, id)| id).unwrap_or(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Viewer notification subscription state for a repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionState {
    Subscribed,
    Unsubscribed,
    Ignored,
}

impl SubscriptionState {
    pub fn is_watching(self) -> bool {
        self == SubscriptionState::Subscribed
    }

    /// State requested by a watch toggle starting from `current`.
    /// Anything other than SUBSCRIBED toggles to SUBSCRIBED.
    pub fn toggle_target(current: Option<SubscriptionState>) -> SubscriptionState {
        match current {
            Some(SubscriptionState::Subscribed) => SubscriptionState::Unsubscribed,
            _ => SubscriptionState::Subscribed,
        }
    }
}

impl fmt::Display for SubscriptionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SubscriptionState::Subscribed => "SUBSCRIBED",
            SubscriptionState::Unsubscribed => "UNSUBSCRIBED",
            SubscriptionState::Ignored => "IGNORED",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalCount {
    #[serde(rename = "totalCount")]
    pub total_count: u64,
}

impl TotalCount {
    pub fn new(total_count: u64) -> Self {
        Self { total_count }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryOwner {
    pub login: String,
    pub url: String,
}

/// Repository record as held in the normalized cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(rename = "descriptionHTML", default)]
    pub description_html: String,
    pub primary_language: Option<Language>,
    pub owner: Option<RepositoryOwner>,
    pub stargazers: TotalCount,
    pub watchers: TotalCount,
    pub viewer_subscription: Option<SubscriptionState>,
    pub viewer_has_starred: bool,
}

impl Repository {
    pub fn entity_id(&self) -> EntityId {
        EntityId::repository(&self.id)
    }

    pub fn is_watching(&self) -> bool {
        self.viewer_subscription.is_some_and(SubscriptionState::is_watching)
    }
}

/// Rate limit state reported by the last API response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitState {
    pub remaining: u32,
    pub limit: u32,
    pub reset_time: chrono::DateTime<chrono::Utc>,
    pub is_limited: bool,
}

impl Default for RateLimitState {
    fn default() -> Self {
        Self {
            remaining: 5000,
            limit: 5000,
            reset_time: chrono::Utc::now() + chrono::Duration::hours(1),
            is_limited: false,
        }
    }
}
