use crate::cache::NormalizedCache;
use crate::models::Repository;
use crate::profile::ProfileRender;
use crate::repository_item::{OfferedActions, StarAction, WatchAction};
use colored::*;

/// Terminal rendering of the profile view
pub fn render_profile(render: &ProfileRender, cache: &NormalizedCache) -> String {
    match render {
        ProfileRender::Error(message) => format!("{} {}", "Error:".red().bold(), message),
        ProfileRender::Loading => "Loading ...".dimmed().to_string(),
        ProfileRender::List(ids) => ids
            .iter()
            .filter_map(|id| cache.read(id))
            .map(|repository| render_repository(&repository))
            .collect::<Vec<_>>()
            .join(&format!("\n{}\n", "-".repeat(50).dimmed())),
    }
}

pub fn star_label(repository: &Repository) -> String {
    let count = repository.stargazers.total_count;
    match OfferedActions::for_repository(repository).star {
        StarAction::Star => format!("{} Star", count),
        StarAction::Unstar => format!("{} Unstar", count),
    }
}

pub fn watch_label(repository: &Repository) -> String {
    let count = repository.watchers.total_count;
    match OfferedActions::for_repository(repository).watch {
        WatchAction::Watch => format!("{} Watch", count),
        WatchAction::Unwatch => format!("{} Unwatch", count),
    }
}

pub fn render_repository(repository: &Repository) -> String {
    let mut lines = vec![
        format!(
            "{} {}",
            repository.name.bold().green(),
            repository.url.dimmed()
        ),
        format!("{} Stars", repository.stargazers.total_count),
        format!(
            "[{}] [{}]",
            star_label(repository).yellow(),
            watch_label(repository).cyan()
        ),
    ];

    let description = strip_html(&repository.description_html);
    if !description.is_empty() {
        lines.push(description);
    }
    if let Some(language) = &repository.primary_language {
        lines.push(format!("Language: {}", language.name));
    }
    if let Some(owner) = &repository.owner {
        lines.push(format!("Owner: {} ({})", owner.login, owner.url));
    }

    lines.join("\n")
}

/// Drop markup from `descriptionHTML`, then decode named and numeric entities
pub fn strip_html(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }

    html_escape::decode_html_entities(&text).trim().to_string()
}
