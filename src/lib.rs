pub mod cache;
pub mod cli;
pub mod error;
pub mod github;
pub mod models;
pub mod profile;
pub mod render;
pub mod repository_item;
pub mod types;

pub use cache::NormalizedCache;
pub use error::{GitHubProfileError, Result};
pub use github::{GitHubApi, GitHubClient};
pub use profile::{ProfileController, ProfileRender};
pub use repository_item::RepositoryItem;
