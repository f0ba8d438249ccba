#![allow(dead_code)]

use async_trait::async_trait;
use github_profile::error::{GitHubProfileError, Result};
use github_profile::github::GitHubApi;
use github_profile::models::{Language, Repository, RepositoryOwner, SubscriptionState, TotalCount};
use github_profile::types::{
    GraphQlErrorEntry, GraphQlResponse, RepositoryConnection, RepositoryEdge, StarPayload,
    Starrable, Subscribable, SubscriptionPayload, Viewer, ViewerData,
};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

pub fn repository(id: &str, stars: u64, watchers: u64) -> Repository {
    Repository {
        id: id.to_string(),
        name: format!("repo-{}", id.to_lowercase()),
        url: format!("https://github.com/octocat/repo-{}", id.to_lowercase()),
        description_html: "<div>A <em>test</em> repository</div>".to_string(),
        primary_language: Some(Language {
            name: "Rust".to_string(),
        }),
        owner: Some(RepositoryOwner {
            login: "octocat".to_string(),
            url: "https://github.com/octocat".to_string(),
        }),
        stargazers: TotalCount::new(stars),
        watchers: TotalCount::new(watchers),
        viewer_subscription: Some(SubscriptionState::Unsubscribed),
        viewer_has_starred: false,
    }
}

/// What the fake answers to the listing query
#[derive(Debug, Clone)]
pub enum ViewerReply {
    Repositories(Vec<Repository>),
    NoViewer,
    PartialWithErrors(Vec<Repository>, Vec<String>),
    /// `None` entries come back as `"node": null`
    NullableNodes(Vec<Option<Repository>>, Vec<String>),
    TransportError(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeCall {
    ViewerRepositories { first: u32 },
    AddStar(String),
    RemoveStar(String),
    UpdateSubscription(String, SubscriptionState),
}

/// In-memory stand-in for the GitHub GraphQL API
pub struct FakeGitHub {
    viewer: Mutex<ViewerReply>,
    fail_mutations: Mutex<Option<String>>,
    gate: Mutex<Option<Arc<Semaphore>>>,
    calls: Mutex<Vec<FakeCall>>,
}

impl FakeGitHub {
    pub fn new(repositories: Vec<Repository>) -> Arc<Self> {
        Arc::new(Self {
            viewer: Mutex::new(ViewerReply::Repositories(repositories)),
            fail_mutations: Mutex::new(None),
            gate: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn with_reply(reply: ViewerReply) -> Arc<Self> {
        let fake = Self::new(Vec::new());
        *fake.viewer.lock().unwrap() = reply;
        fake
    }

    pub fn set_reply(&self, reply: ViewerReply) {
        *self.viewer.lock().unwrap() = reply;
    }

    pub fn fail_mutations(&self, message: &str) {
        *self.fail_mutations.lock().unwrap() = Some(message.to_string());
    }

    /// Hold every mutation until a permit is added to the returned semaphore
    pub fn gate_mutations(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn calls(&self) -> Vec<FakeCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn mutation_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| !matches!(c, FakeCall::ViewerRepositories { .. }))
            .count()
    }

    async fn settle(&self, call: FakeCall) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|e| GitHubProfileError::ApiError(e.to_string()))?;
            permit.forget();
        }
        let failure = self.fail_mutations.lock().unwrap().clone();
        match failure {
            Some(message) => Err(GitHubProfileError::GraphQlError(message)),
            None => Ok(()),
        }
    }
}

fn viewer_data(repositories: Vec<Repository>) -> ViewerData {
    nullable_viewer_data(repositories.into_iter().map(Some).collect())
}

fn nullable_viewer_data(nodes: Vec<Option<Repository>>) -> ViewerData {
    ViewerData {
        viewer: Some(Viewer {
            repositories: RepositoryConnection {
                edges: Some(
                    nodes
                        .into_iter()
                        .map(|node| Some(RepositoryEdge { node }))
                        .collect(),
                ),
            },
        }),
    }
}

fn error_entries(messages: Vec<String>) -> Vec<GraphQlErrorEntry> {
    messages
        .into_iter()
        .map(|message| GraphQlErrorEntry { message, kind: None })
        .collect()
}

#[async_trait]
impl GitHubApi for FakeGitHub {
    async fn viewer_repositories(&self, first: u32) -> Result<GraphQlResponse<ViewerData>> {
        self.calls
            .lock()
            .unwrap()
            .push(FakeCall::ViewerRepositories { first });
        let reply = self.viewer.lock().unwrap().clone();
        match reply {
            ViewerReply::Repositories(repositories) => Ok(GraphQlResponse {
                data: Some(viewer_data(repositories)),
                errors: Vec::new(),
            }),
            ViewerReply::NoViewer => Ok(GraphQlResponse {
                data: Some(ViewerData { viewer: None }),
                errors: Vec::new(),
            }),
            ViewerReply::PartialWithErrors(repositories, messages) => Ok(GraphQlResponse {
                data: Some(viewer_data(repositories)),
                errors: error_entries(messages),
            }),
            ViewerReply::NullableNodes(nodes, messages) => Ok(GraphQlResponse {
                data: Some(nullable_viewer_data(nodes)),
                errors: error_entries(messages),
            }),
            ViewerReply::TransportError(message) => Err(GitHubProfileError::ApiError(message)),
        }
    }

    async fn add_star(&self, starrable_id: &str) -> Result<StarPayload> {
        self.settle(FakeCall::AddStar(starrable_id.to_string())).await?;
        Ok(StarPayload {
            starrable: Starrable {
                id: starrable_id.to_string(),
                viewer_has_starred: true,
            },
        })
    }

    async fn remove_star(&self, starrable_id: &str) -> Result<StarPayload> {
        self.settle(FakeCall::RemoveStar(starrable_id.to_string())).await?;
        Ok(StarPayload {
            starrable: Starrable {
                id: starrable_id.to_string(),
                viewer_has_starred: false,
            },
        })
    }

    async fn update_subscription(
        &self,
        subscribable_id: &str,
        state: SubscriptionState,
    ) -> Result<SubscriptionPayload> {
        self.settle(FakeCall::UpdateSubscription(subscribable_id.to_string(), state))
            .await?;
        Ok(SubscriptionPayload {
            subscribable: Subscribable {
                id: subscribable_id.to_string(),
                viewer_subscription: Some(state),
            },
        })
    }
}
