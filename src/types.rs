use crate::models::{Repository, SubscriptionState};
use serde::{Deserialize, Serialize};

pub const REPOSITORY_FRAGMENT: &str = r#"
  fragment repository on Repository {
    id
    name
    url
    descriptionHTML
    primaryLanguage {
      name
    }
    owner {
      login
      url
    }
    stargazers {
      totalCount
    }
    watchers {
      totalCount
    }
    viewerSubscription
    viewerHasStarred
  }
"#;

pub const GET_VIEWER_REPOSITORIES: &str = r#"
  query($first: Int!) {
    viewer {
      repositories(
        first: $first
        orderBy: { field: STARGAZERS, direction: DESC }
      ) {
        edges {
          node {
            ...repository
          }
        }
      }
    }
  }
"#;

pub const STAR_REPOSITORY: &str = r#"
  mutation($id: ID!) {
    addStar(input: { starrableId: $id }) {
      starrable {
        id
        viewerHasStarred
      }
    }
  }
"#;

pub const UNSTAR_REPOSITORY: &str = r#"
  mutation($id: ID!) {
    removeStar(input: { starrableId: $id }) {
      starrable {
        id
        viewerHasStarred
      }
    }
  }
"#;

pub const WATCH_REPOSITORY: &str = r#"
  mutation($id: ID!, $viewerSubscription: SubscriptionState!) {
    updateSubscription(
      input: { subscribableId: $id, state: $viewerSubscription }
    ) {
      subscribable {
        id
        viewerSubscription
      }
    }
  }
"#;

/// Full document for the viewer repositories query, fragment included
pub fn viewer_repositories_document() -> String {
    format!("{}{}", GET_VIEWER_REPOSITORIES, REPOSITORY_FRAGMENT)
}

// GraphQL request/response envelopes
#[derive(Debug, Serialize)]
pub struct GraphQlRequest<'a, V> {
    pub query: &'a str,
    pub variables: V,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlErrorEntry>,
}

impl<T> GraphQlResponse<T> {
    pub fn error_message(&self) -> Option<String> {
        if self.errors.is_empty() {
            return None;
        }
        Some(
            self.errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    pub fn is_rate_limited(&self) -> bool {
        self.errors
            .iter()
            .any(|e| e.kind.as_deref() == Some("RATE_LIMITED"))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlErrorEntry {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

// Variables
#[derive(Debug, Serialize)]
pub struct FirstVariables {
    pub first: u32,
}

#[derive(Debug, Serialize)]
pub struct IdVariables<'a> {
    pub id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionVariables<'a> {
    pub id: &'a str,
    pub viewer_subscription: SubscriptionState,
}

// Query payloads
#[derive(Debug, Clone, Deserialize)]
pub struct ViewerData {
    pub viewer: Option<Viewer>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Viewer {
    pub repositories: RepositoryConnection,
}

/// Edges and nodes are nullable: a partial response nulls out what it could not resolve
#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryConnection {
    #[serde(default)]
    pub edges: Option<Vec<Option<RepositoryEdge>>>,
}

impl RepositoryConnection {
    /// Repositories that resolved, in response order
    pub fn nodes(&self) -> impl Iterator<Item = &Repository> {
        self.edges
            .iter()
            .flatten()
            .flatten()
            .filter_map(|edge| edge.node.as_ref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryEdge {
    pub node: Option<Repository>,
}

// Mutation payloads
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddStarData {
    pub add_star: StarPayload,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveStarData {
    pub remove_star: StarPayload,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StarPayload {
    pub starrable: Starrable,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Starrable {
    pub id: String,
    pub viewer_has_starred: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSubscriptionData {
    pub update_subscription: SubscriptionPayload,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionPayload {
    pub subscribable: Subscribable,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscribable {
    pub id: String,
    pub viewer_subscription: Option<SubscriptionState>,
}
