use crate::error::{GitHubProfileError, Result};
use crate::models::{RateLimitState, SubscriptionState};
use crate::types::{
    viewer_repositories_document, AddStarData, FirstVariables, GraphQlRequest, GraphQlResponse,
    IdVariables, RemoveStarData, StarPayload, SubscriptionPayload, SubscriptionVariables,
    UpdateSubscriptionData, ViewerData, STAR_REPOSITORY, UNSTAR_REPOSITORY, WATCH_REPOSITORY,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, SystemTime};
use tokio::time::sleep;
use tracing::{debug, warn};
use url::Url;

pub const DEFAULT_ENDPOINT: &str = "https://api.github.com/graphql";
const MAX_RETRIES: u32 = 3;
const MAX_RATE_LIMIT_WAIT: Duration = Duration::from_secs(60);

/// Operations the profile view and repository rows need from GitHub
#[async_trait]
pub trait GitHubApi: Send + Sync {
    /// Viewer repositories ordered by stargazers, descending. GraphQL errors
    /// come back alongside any partial data.
    async fn viewer_repositories(&self, first: u32) -> Result<GraphQlResponse<ViewerData>>;

    async fn add_star(&self, starrable_id: &str) -> Result<StarPayload>;

    async fn remove_star(&self, starrable_id: &str) -> Result<StarPayload>;

    async fn update_subscription(
        &self,
        subscribable_id: &str,
        state: SubscriptionState,
    ) -> Result<SubscriptionPayload>;
}

pub struct GitHubClient {
    client: Client,
    token: String,
    endpoint: Url,
    retry_delay: Duration,
    rate_limit: Mutex<RateLimitState>,
}

impl GitHubClient {
    pub fn new(token: String) -> Result<Self> {
        Self::with_endpoint(token, DEFAULT_ENDPOINT)
    }

    pub fn with_endpoint(token: String, endpoint: &str) -> Result<Self> {
        if token.trim().is_empty() {
            return Err(GitHubProfileError::AuthError("GitHub token is empty".to_string()));
        }

        let endpoint = Url::parse(endpoint)?;
        let client = Client::builder()
            .user_agent("GitHub Profile/0.1.0")
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(GitHubClient {
            client,
            token,
            endpoint,
            retry_delay: Duration::from_secs(2),
            rate_limit: Mutex::new(RateLimitState::default()),
        })
    }

    /// Pause between retries of a 5xx response
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Rate limit state from the most recent response
    pub fn rate_limit(&self) -> RateLimitState {
        self.rate_limit
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn make_request<B: Serialize + ?Sized>(&self, body: &B) -> Result<Response> {
        let mut retries = 0;

        loop {
            let response = self
                .client
                .post(self.endpoint.clone())
                .header("Authorization", format!("bearer {}", self.token))
                .json(body)
                .send()
                .await?;

            let rate_limit = rate_limit_from_headers(response.headers());
            if let Some(state) = &rate_limit {
                *self.rate_limit.lock().unwrap_or_else(PoisonError::into_inner) = state.clone();
            }

            match response.status() {
                reqwest::StatusCode::OK => {
                    if let Some(state) = rate_limit.as_ref().filter(|s| s.remaining < 10) {
                        warn!(remaining = state.remaining, "Rate limit low, adding delay");
                        sleep(Duration::from_secs(1)).await;
                    }
                    return Ok(response);
                }
                reqwest::StatusCode::UNAUTHORIZED => {
                    return Err(GitHubProfileError::AuthError(
                        "GitHub rejected the token".to_string(),
                    ));
                }
                reqwest::StatusCode::NOT_FOUND => {
                    return Err(GitHubProfileError::NotFound(format!(
                        "Resource not found: {}",
                        self.endpoint
                    )));
                }
                reqwest::StatusCode::FORBIDDEN if rate_limit.as_ref().is_some_and(|s| s.is_limited) => {
                    let reset_time = rate_limit
                        .as_ref()
                        .map(|s| SystemTime::from(s.reset_time))
                        .unwrap_or_else(SystemTime::now);
                    let wait_time = reset_time
                        .duration_since(SystemTime::now())
                        .unwrap_or(Duration::from_secs(0));

                    if wait_time > MAX_RATE_LIMIT_WAIT {
                        return Err(GitHubProfileError::RateLimitExceeded(format!(
                            "API rate limit exceeded. Reset at: {:?}",
                            reset_time
                        )));
                    }
                    warn!(wait_seconds = wait_time.as_secs() + 1, "Rate limit reached, waiting");
                    sleep(wait_time + Duration::from_secs(1)).await;
                    continue;
                }
                status if status.is_server_error() && retries < MAX_RETRIES => {
                    warn!(%status, retries, "Server error, retrying");
                    sleep(self.retry_delay).await;
                    retries += 1;
                    continue;
                }
                status => {
                    let error_text = response.text().await.unwrap_or_default();
                    return Err(GitHubProfileError::ApiError(format!(
                        "API request failed with status {}: {}",
                        status, error_text
                    )));
                }
            }
        }
    }

    /// Run a GraphQL document and return the raw envelope, errors included
    pub async fn execute<V, T>(&self, query: &str, variables: V) -> Result<GraphQlResponse<T>>
    where
        V: Serialize + Send,
        T: DeserializeOwned,
    {
        let request = GraphQlRequest { query, variables };
        let response = self.make_request(&request).await?;
        let body = response.text().await?;
        let envelope: GraphQlResponse<T> = serde_json::from_str(&body)?;

        if envelope.is_rate_limited() {
            return Err(GitHubProfileError::RateLimitExceeded(
                envelope.error_message().unwrap_or_default(),
            ));
        }
        Ok(envelope)
    }

    /// Mutations are all-or-nothing: any GraphQL error fails the call
    async fn mutate<V, T>(&self, document: &str, variables: V) -> Result<T>
    where
        V: Serialize + Send,
        T: DeserializeOwned,
    {
        let envelope: GraphQlResponse<T> = self.execute(document, variables).await?;
        if let Some(message) = envelope.error_message() {
            return Err(GitHubProfileError::GraphQlError(message));
        }
        envelope
            .data
            .ok_or_else(|| GitHubProfileError::ApiError("Mutation returned no data".to_string()))
    }
}

#[async_trait]
impl GitHubApi for GitHubClient {
    async fn viewer_repositories(&self, first: u32) -> Result<GraphQlResponse<ViewerData>> {
        debug!(first, "Fetching viewer repositories");
        let document = viewer_repositories_document();
        self.execute(&document, FirstVariables { first }).await
    }

    async fn add_star(&self, starrable_id: &str) -> Result<StarPayload> {
        debug!(starrable_id, "addStar");
        let data: AddStarData = self
            .mutate(STAR_REPOSITORY, IdVariables { id: starrable_id })
            .await?;
        Ok(data.add_star)
    }

    async fn remove_star(&self, starrable_id: &str) -> Result<StarPayload> {
        debug!(starrable_id, "removeStar");
        let data: RemoveStarData = self
            .mutate(UNSTAR_REPOSITORY, IdVariables { id: starrable_id })
            .await?;
        Ok(data.remove_star)
    }

    async fn update_subscription(
        &self,
        subscribable_id: &str,
        state: SubscriptionState,
    ) -> Result<SubscriptionPayload> {
        debug!(subscribable_id, %state, "updateSubscription");
        let variables = SubscriptionVariables {
            id: subscribable_id,
            viewer_subscription: state,
        };
        let data: UpdateSubscriptionData = self.mutate(WATCH_REPOSITORY, variables).await?;
        Ok(data.update_subscription)
    }
}

/// Rate limit state from response headers; `None` when GitHub sent none
pub fn rate_limit_from_headers(headers: &HeaderMap) -> Option<RateLimitState> {
    let header = |name: &str| headers.get(name).and_then(|h| h.to_str().ok());

    let remaining = header("X-RateLimit-Remaining")?.parse::<u32>().ok()?;

    let limit = header("X-RateLimit-Limit")
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(5000);

    let reset = header("X-RateLimit-Reset")
        .and_then(|s| s.parse::<i64>().ok())
        .and_then(|timestamp| DateTime::from_timestamp(timestamp, 0))
        .unwrap_or_else(|| Utc::now() + chrono::Duration::hours(1));

    Some(RateLimitState {
        remaining,
        limit,
        reset_time: reset,
        is_limited: remaining == 0,
    })
}
