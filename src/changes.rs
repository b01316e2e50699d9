//! Matching changed files against build dependencies.
//!
//! Given the dependencies of one build and the files touched by a change
//! (e.g. a pull request), decide whether the build has to run again.
//!
//! A changed file invalidates the build when it:
//! - equals a dependency path (`requirements.txt`)
//! - lies under a dependency directory (`utils` covers `utils/lib/a.py`)
//! - matches a dependency holding glob metacharacters (`patches/*.patch`),
//!   either directly or through one of its parent directories
//!
//! A dependency of `.` is the whole context and matches everything.

use glob::{MatchOptions, Pattern};
use tracing::{debug, warn};

use crate::extractor::Dependencies;
use crate::paths::{canonicalize, is_within};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

enum Matcher {
    Prefix(String),
    Glob(Pattern),
}

impl Matcher {
    fn new(dependency: &str) -> Self {
        if !dependency.contains(['*', '?', '[']) {
            return Self::Prefix(dependency.to_string());
        }
        match Pattern::new(dependency) {
            Ok(pattern) => Self::Glob(pattern),
            Err(e) => {
                warn!("Treating dependency {:?} as a literal path: {}", dependency, e);
                Self::Prefix(dependency.to_string())
            }
        }
    }

    fn matches(&self, changed: &str) -> bool {
        match self {
            Self::Prefix(dependency) => is_within(changed, dependency),
            Self::Glob(pattern) => {
                ancestors(changed).any(|candidate| pattern.matches_with(candidate, MATCH_OPTIONS))
            }
        }
    }
}

/// `a/b/c`, `a/b`, `a`
fn ancestors(path: &str) -> impl Iterator<Item = &str> {
    std::iter::successors(Some(path), |p| p.rfind('/').map(|i| &p[..i]))
}

/// Compiled form of a dependency set for repeated matching.
pub struct ChangeMatcher {
    matchers: Vec<Matcher>,
}

impl ChangeMatcher {
    pub fn new(dependencies: &Dependencies) -> Self {
        Self {
            matchers: dependencies.iter().map(Matcher::new).collect(),
        }
    }

    /// Whether a single changed file invalidates the build.
    pub fn is_affected_by(&self, changed: &str) -> bool {
        let changed = canonicalize(changed);
        self.matchers.iter().any(|m| m.matches(&changed))
    }
}

/// Return the first changed file, in input order, that invalidates a build
/// with these dependencies, or `None` if the build is unaffected.
///
/// # Examples
///
/// ```rust
/// use buildinputs::changes::rebuild_reason;
/// use buildinputs::extractor::Dependencies;
///
/// let deps = Dependencies::from_raw(["/utils", "/requirements.txt"]);
/// assert_eq!(
///     rebuild_reason(&deps, ["README.md", "utils/pip.py"]),
///     Some("utils/pip.py".to_string())
/// );
/// assert_eq!(rebuild_reason(&deps, ["docs/index.md"]), None);
/// ```
pub fn rebuild_reason<I, S>(dependencies: &Dependencies, changed_files: I) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let matcher = ChangeMatcher::new(dependencies);
    let reason = changed_files
        .into_iter()
        .map(|f| f.as_ref().to_string())
        .find(|f| matcher.is_affected_by(f));
    if let Some(file) = &reason {
        debug!("Rebuild triggered by {}", file);
    }
    reason
}

/// Parse a newline-separated changed-files list; blank lines are skipped.
pub fn parse_changed_files(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
