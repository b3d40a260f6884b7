//! CI environment snapshot.
//!
//! Travis CI, AppVeyor and GitHub Actions each expose the repository slug,
//! the pushed tag and the commit under their own variable names. The
//! snapshot is taken once at startup so the resolver never reads process
//! state directly.

use std::collections::BTreeMap;
use std::env;

use crate::input::clean;

/// Variables the resolver may fall back to, in lookup order per concern.
const SLUG_VARS: &[&str] = &["TRAVIS_REPO_SLUG", "APPVEYOR_REPO_NAME", "GITHUB_REPOSITORY"];
const TAG_VARS: &[&str] = &["TRAVIS_TAG", "APPVEYOR_REPO_TAG_NAME"];
const COMMIT_VARS: &[&str] = &["TRAVIS_COMMIT", "APPVEYOR_REPO_COMMIT", "GITHUB_SHA"];
const GITHUB_REF_NAME: &str = "GITHUB_REF_NAME";
const GITHUB_REF_TYPE: &str = "GITHUB_REF_TYPE";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CiEnvironment {
    vars: BTreeMap<String, String>,
}

impl CiEnvironment {
    /// Capture the relevant variables from the current process.
    pub fn from_process() -> Self {
        Self::from_pairs(
            SLUG_VARS
                .iter()
                .chain(TAG_VARS)
                .chain(COMMIT_VARS)
                .chain(&[GITHUB_REF_NAME, GITHUB_REF_TYPE])
                .filter_map(|key| env::var(key).ok().map(|value| (*key, value))),
        )
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Cleaned value of `key`; empty counts as unset.
    pub fn get(&self, key: &str) -> Option<String> {
        self.vars.get(key).and_then(|v| clean(v))
    }

    fn first(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|key| self.get(key))
    }

    pub fn slug(&self) -> Option<String> {
        self.first(SLUG_VARS)
    }

    /// Tag being built. GitHub Actions only counts when the ref is a tag.
    pub fn tag(&self) -> Option<String> {
        self.first(TAG_VARS).or_else(|| {
            (self.get(GITHUB_REF_TYPE).as_deref() == Some("tag"))
                .then(|| self.get(GITHUB_REF_NAME))
                .flatten()
        })
    }

    pub fn commitish(&self) -> Option<String> {
        self.first(COMMIT_VARS)
    }
}

/// Platform name used in substitutions and to place the hash manifest.
pub fn platform() -> &'static str {
    env::consts::OS
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    #[test]
    fn travis_wins_over_appveyor() {
        let ci = CiEnvironment::from_pairs([
            ("TRAVIS_REPO_SLUG", "travis/repo"),
            ("APPVEYOR_REPO_NAME", "appveyor/repo"),
            ("GITHUB_REPOSITORY", "gh/repo"),
        ]);
        assert_eq!(ci.slug().as_deref(), Some("travis/repo"));
    }

    #[test]
    fn empty_values_fall_through() {
        let ci = CiEnvironment::from_pairs([
            ("TRAVIS_TAG", ""),
            ("APPVEYOR_REPO_TAG_NAME", " v2.0.0 "),
        ]);
        assert_eq!(ci.tag().as_deref(), Some("v2.0.0"));
    }

    #[test]
    fn github_ref_name_needs_tag_ref_type() {
        let branch = CiEnvironment::from_pairs([
            ("GITHUB_REF_NAME", "main"),
            ("GITHUB_REF_TYPE", "branch"),
        ]);
        assert_eq!(branch.tag(), None);

        let tag = CiEnvironment::from_pairs([
            ("GITHUB_REF_NAME", "v3.1.0"),
            ("GITHUB_REF_TYPE", "tag"),
        ]);
        assert_eq!(tag.tag().as_deref(), Some("v3.1.0"));
    }

    #[test]
    fn commitish_fallback_order() {
        let ci = CiEnvironment::from_pairs([("APPVEYOR_REPO_COMMIT", "abc"), ("GITHUB_SHA", "def")]);
        assert_eq!(ci.commitish().as_deref(), Some("abc"));
        assert_eq!(CiEnvironment::default().commitish(), None);
    }

    #[test]
    #[serial]
    fn process_snapshot_only_keeps_known_variables() {
        temp_env::with_vars(
            [
                ("TRAVIS_REPO_SLUG", Some("octo/app")),
                ("TRAVIS_TAG", None),
                ("APPVEYOR_REPO_TAG_NAME", None),
                ("GITHUB_REF_TYPE", None),
                ("SATSUKI_UNRELATED", Some("x")),
            ],
            || {
                let ci = CiEnvironment::from_process();
                assert_eq!(ci.slug().as_deref(), Some("octo/app"));
                assert_eq!(ci.tag(), None);
                assert_eq!(ci.get("SATSUKI_UNRELATED"), None);
            },
        );
    }

    #[test]
    fn platform_is_known() {
        assert!(!platform().is_empty());
    }
}
