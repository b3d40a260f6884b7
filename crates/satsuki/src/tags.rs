//! Tag cleanup after a release is removed.
//!
//! Everything here is best-effort: failures are reported and swallowed so
//! that a stubborn tag never fails an otherwise finished run.

use satsuki_git::TagDeleter;
use satsuki_github::{ReleaseGateway, Repository};

use crate::engine::Reporter;

/// Matches tag names against a shell-style pattern. Falls back to exact
/// comparison when the pattern does not parse.
#[derive(Debug, Clone)]
pub struct TagMatcher {
    raw: String,
    pattern: Option<glob::Pattern>,
}

impl TagMatcher {
    pub fn new(pattern: &str) -> Self {
        Self {
            raw: pattern.to_string(),
            pattern: glob::Pattern::new(pattern).ok(),
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        match &self.pattern {
            Some(pattern) => pattern.matches(name),
            None => self.raw == name,
        }
    }
}

/// Delete every remote tag matching `pattern`, locally and on the remote.
///
/// A tag that still has a release is skipped unless `force` is set, in
/// which case the release goes first. Returns the tags that were deleted
/// in at least one place.
pub fn clean_tags(
    gateway: &dyn ReleaseGateway,
    repo: &Repository,
    pattern: &str,
    force: bool,
    git: &dyn TagDeleter,
    reporter: &mut dyn Reporter,
) -> Vec<String> {
    reporter.info(&format!("cleaning tag(s) matching {pattern}"));

    let tags = match gateway.list_tags(repo) {
        Ok(tags) => tags,
        Err(err) => {
            reporter.warn(&format!("could not list tags: {err}"));
            return Vec::new();
        }
    };

    let matcher = TagMatcher::new(pattern);
    let mut deleted = Vec::new();

    for tag in tags.iter().filter(|t| matcher.matches(&t.name)) {
        match gateway.release_by_tag(repo, &tag.name) {
            Ok(Some(release)) if !force => {
                reporter.info(&format!(
                    "tag {} still has release {}; not deleting",
                    tag.name, release.id
                ));
                continue;
            }
            Ok(Some(release)) => {
                reporter.info(&format!("deleting release {} for tag {}", release.id, tag.name));
                if let Err(err) = gateway.delete_release(repo, &release) {
                    reporter.warn(&format!(
                        "could not delete release for tag {}: {err}; keeping tag",
                        tag.name
                    ));
                    continue;
                }
            }
            Ok(None) => {}
            Err(err) => {
                reporter.warn(&format!(
                    "could not check release for tag {}: {err}; keeping tag",
                    tag.name
                ));
                continue;
            }
        }

        let mut removed = false;

        reporter.info(&format!("deleting local tag {}", tag.name));
        match git.delete_local_tag(&tag.name) {
            Ok(()) => removed = true,
            Err(err) => reporter.warn(&format!("trouble deleting local tag {}: {err:#}", tag.name)),
        }

        reporter.info(&format!("deleting remote tag {}", tag.name));
        match git.delete_remote_tag(&tag.name) {
            Ok(()) => removed = true,
            Err(err) => reporter.warn(&format!("trouble deleting remote tag {}: {err:#}", tag.name)),
        }

        if removed {
            deleted.push(tag.name.clone());
        }
    }

    deleted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{CollectingReporter, FakeGateway, FakeGit};

    #[test]
    fn matcher_supports_globs_and_falls_back_to_exact() {
        let glob = TagMatcher::new("v1.*");
        assert!(glob.matches("v1.0.0"));
        assert!(glob.matches("v1.2"));
        assert!(!glob.matches("v2.0.0"));

        let invalid = TagMatcher::new("v[1");
        assert!(invalid.matches("v[1"));
        assert!(!invalid.matches("v1"));
    }

    #[test]
    fn deletes_matching_tags_without_releases() {
        let gh = FakeGateway::new();
        gh.add_tag("v1.0.0", "aaa");
        gh.add_tag("v1.1.0", "bbb");
        gh.add_tag("v2.0.0", "ccc");
        let git = FakeGit::default();
        let mut reporter = CollectingReporter::default();

        let deleted = clean_tags(&gh, &gh.repo(), "v1.*", false, &git, &mut reporter);

        assert_eq!(deleted, vec!["v1.0.0", "v1.1.0"]);
        assert_eq!(git.local_deleted(), vec!["v1.0.0", "v1.1.0"]);
        assert_eq!(git.remote_deleted(), vec!["v1.0.0", "v1.1.0"]);
    }

    #[test]
    fn tag_with_release_is_kept_without_force() {
        let gh = FakeGateway::new();
        gh.add_tag("v1.0.0", "aaa");
        gh.add_release("v1.0.0");
        let git = FakeGit::default();
        let mut reporter = CollectingReporter::default();

        let deleted = clean_tags(&gh, &gh.repo(), "v1.0.0", false, &git, &mut reporter);

        assert!(deleted.is_empty());
        assert!(git.local_deleted().is_empty());
        assert!(reporter.infos.iter().any(|m| m.contains("still has release")));
        assert_eq!(gh.release_count(), 1);
    }

    #[test]
    fn force_deletes_release_then_tag() {
        let gh = FakeGateway::new();
        gh.add_tag("v1.0.0", "aaa");
        gh.add_release("v1.0.0");
        let git = FakeGit::default();
        let mut reporter = CollectingReporter::default();

        let deleted = clean_tags(&gh, &gh.repo(), "v1.0.0", true, &git, &mut reporter);

        assert_eq!(deleted, vec!["v1.0.0"]);
        assert_eq!(gh.release_count(), 0);
    }

    #[test]
    fn git_failures_are_logged_not_fatal() {
        let gh = FakeGateway::new();
        gh.add_tag("v1.0.0", "aaa");
        let git = FakeGit::failing();
        let mut reporter = CollectingReporter::default();

        let deleted = clean_tags(&gh, &gh.repo(), "v1.0.0", false, &git, &mut reporter);

        assert!(deleted.is_empty());
        assert!(reporter.warns.iter().any(|m| m.contains("trouble deleting local tag v1.0.0")));
        assert!(reporter.warns.iter().any(|m| m.contains("trouble deleting remote tag v1.0.0")));
    }

    #[test]
    fn listing_failure_is_swallowed() {
        let gh = FakeGateway::new();
        gh.fail_tag_listing();
        let git = FakeGit::default();
        let mut reporter = CollectingReporter::default();

        let deleted = clean_tags(&gh, &gh.repo(), "*", false, &git, &mut reporter);

        assert!(deleted.is_empty());
        assert!(reporter.warns.iter().any(|m| m.contains("could not list tags")));
    }
}
