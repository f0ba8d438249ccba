mod common;

use common::repository;
use github_profile::cache::NormalizedCache;
use github_profile::models::{EntityId, SubscriptionState};
use github_profile::profile::ProfileRender;
use github_profile::render::{render_profile, render_repository, star_label, strip_html, watch_label};

fn plain() {
    colored::control::set_override(false);
}

#[test]
fn test_error_render_shows_only_error() {
    plain();
    let cache = NormalizedCache::new();
    cache.write_entity(repository("R1", 10, 1));

    let output = render_profile(&ProfileRender::Error("Bad credentials".to_string()), &cache);

    assert_eq!(output, "Error: Bad credentials");
    assert!(!output.contains("Loading"));
    assert!(!output.contains("repo-r1"));
}

#[test]
fn test_loading_render_shows_only_loading() {
    plain();
    let cache = NormalizedCache::new();
    let output = render_profile(&ProfileRender::Loading, &cache);
    assert_eq!(output, "Loading ...");
}

#[test]
fn test_list_render_reads_from_cache() {
    plain();
    let cache = NormalizedCache::new();
    let r1 = cache.write_entity(repository("R1", 10, 1));
    let r2 = cache.write_entity(repository("R2", 3, 2));

    let output = render_profile(&ProfileRender::List(vec![r1, r2, EntityId::repository("gone")]), &cache);

    assert!(output.contains("repo-r1"));
    assert!(output.contains("10 Stars"));
    assert!(output.contains("repo-r2"));
    assert!(output.find("repo-r1") < output.find("repo-r2"));
    assert!(!output.contains("gone"));
}

#[test]
fn test_repository_labels_follow_state() {
    plain();
    let mut repo = repository("R1", 10, 3);
    assert_eq!(star_label(&repo), "10 Star");
    assert_eq!(watch_label(&repo), "3 Watch");

    repo.viewer_has_starred = true;
    repo.stargazers.total_count = 11;
    repo.viewer_subscription = Some(SubscriptionState::Subscribed);
    repo.watchers.total_count = 4;
    assert_eq!(star_label(&repo), "11 Unstar");
    assert_eq!(watch_label(&repo), "4 Unwatch");

    let output = render_repository(&repo);
    assert!(output.contains("[11 Unstar] [4 Unwatch]"));
    assert!(output.contains("A test repository"));
    assert!(output.contains("Language: Rust"));
    assert!(output.contains("Owner: octocat (https://github.com/octocat)"));
}

#[test]
fn test_optional_details_omitted() {
    plain();
    let mut repo = repository("R1", 0, 0);
    repo.primary_language = None;
    repo.owner = None;
    repo.description_html = String::new();

    let output = render_repository(&repo);
    assert!(!output.contains("Language:"));
    assert!(!output.contains("Owner:"));
    assert_eq!(output.lines().count(), 3);
}

#[test]
fn test_strip_html() {
    assert_eq!(strip_html("<div>Hello &amp; <b>welcome</b></div>"), "Hello & welcome");
    assert_eq!(strip_html("  plain  "), "plain");
    assert_eq!(strip_html("<div></div>"), "");
    assert_eq!(strip_html("a &lt;tag&gt;"), "a <tag>");
    assert_eq!(strip_html("<p>It&#x27;s fast &#8212; really</p>"), "It's fast \u{2014} really");
    assert_eq!(strip_html("&lt;b&gt; stays text"), "<b> stays text");
}
