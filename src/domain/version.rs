//! Release identifiers
//!
//! A [`Version`] is parsed from a PEP 440 string and has two orders:
//!
//! - [`Ord`] is PEP 440 ordering, with one tie-breaker that keeps the order
//!   strict: versions that are PEP 440-equal but written with a different
//!   number of release segments (`4.2` and `4.2.0`) order by segment count.
//!   Source constraints are evaluated with it.
//! - [`Version::recipe_cmp`] is the order of the recipe format. Post and
//!   dev segments become trailing `post`/`dev` components that sort below
//!   numbers, so `1.0 < 1.0.dev0 < 1.0.post1 < 1.0.0 < 1.0.1` there while
//!   PEP 440 puts `1.0.dev0` first. Target ranges use this order.
//!
//! Local version labels (`+local`) are not supported.

use crate::error::ParseError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?ix)
        ^\s*v?
        (?:(?P<epoch>[0-9]+)!)?
        (?P<release>[0-9]+(?:\.[0-9]+)*)
        (?P<pre>[-_.]?(?P<pre_l>alpha|beta|preview|pre|rc|a|b|c)[-_.]?(?P<pre_n>[0-9]+)?)?
        (?P<post>(?:-(?P<post_n1>[0-9]+))|(?:[-_.]?(?P<post_l>post|rev|r)[-_.]?(?P<post_n2>[0-9]+)?))?
        (?P<dev>[-_.]?dev[-_.]?(?P<dev_n>[0-9]+)?)?
        \s*$",
    )
    .unwrap()
});

/// Pre-release phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PreRelease {
    Alpha,
    Beta,
    Rc,
}

impl PreRelease {
    /// Normalised PEP 440 spelling
    pub fn short(&self) -> &'static str {
        match self {
            PreRelease::Alpha => "a",
            PreRelease::Beta => "b",
            PreRelease::Rc => "rc",
        }
    }

    /// Spelling used in recipes
    pub fn long(&self) -> &'static str {
        match self {
            PreRelease::Alpha => "alpha",
            PreRelease::Beta => "beta",
            PreRelease::Rc => "rc",
        }
    }

    fn from_label(label: &str) -> Self {
        match label.to_ascii_lowercase().as_str() {
            "a" | "alpha" => PreRelease::Alpha,
            "b" | "beta" => PreRelease::Beta,
            _ => PreRelease::Rc,
        }
    }
}

/// Position of a version within its release's phases
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum PhaseKey {
    DevOnly,
    Pre(PreRelease, u64),
    Final,
}

/// One component of a version in recipe order; labels sort below numbers
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Component {
    Label(&'static str),
    Number(u64),
}

/// Pre-release rank in recipe order; finals sort above every pre-release
const FINAL_RANK: u8 = 3;

/// An immutable, totally ordered release identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Version {
    epoch: u64,
    release: Vec<u64>,
    pre: Option<(PreRelease, u64)>,
    post: Option<u64>,
    dev: Option<u64>,
}

impl Version {
    /// Parse a PEP 440 version string
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let caps = VERSION_RE
            .captures(input)
            .ok_or_else(|| ParseError::invalid_version(input))?;

        let number = |name: &str| -> Result<Option<u64>, ParseError> {
            caps.name(name)
                .map(|m| {
                    m.as_str()
                        .parse::<u64>()
                        .map_err(|_| ParseError::invalid_version(input))
                })
                .transpose()
        };

        let epoch = number("epoch")?.unwrap_or(0);
        let release = caps
            .name("release")
            .map(|m| m.as_str())
            .unwrap_or_default()
            .split('.')
            .map(|part| {
                part.parse::<u64>()
                    .map_err(|_| ParseError::invalid_version(input))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let pre = match caps.name("pre_l") {
            Some(label) => Some((
                PreRelease::from_label(label.as_str()),
                number("pre_n")?.unwrap_or(0),
            )),
            None => None,
        };

        let post = if caps.name("post").is_some() {
            Some(number("post_n1")?.or(number("post_n2")?).unwrap_or(0))
        } else {
            None
        };

        let dev = if caps.name("dev").is_some() {
            Some(number("dev_n")?.unwrap_or(0))
        } else {
            None
        };

        Ok(Self {
            epoch,
            release,
            pre,
            post,
            dev,
        })
    }

    /// Build a final release from its numeric segments
    pub fn from_release(release: &[u64]) -> Self {
        Self {
            epoch: 0,
            release: if release.is_empty() {
                vec![0]
            } else {
                release.to_vec()
            },
            pre: None,
            post: None,
            dev: None,
        }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn release(&self) -> &[u64] {
        &self.release
    }

    pub fn pre(&self) -> Option<(PreRelease, u64)> {
        self.pre
    }

    pub fn post(&self) -> Option<u64> {
        self.post
    }

    pub fn dev(&self) -> Option<u64> {
        self.dev
    }

    /// Pre-releases and developmental releases
    pub fn is_prerelease(&self) -> bool {
        self.pre.is_some() || self.dev.is_some()
    }

    pub fn is_postrelease(&self) -> bool {
        self.post.is_some()
    }

    /// True when only epoch and release segments are present
    pub fn is_release_only(&self) -> bool {
        self.pre.is_none() && self.post.is_none() && self.dev.is_none()
    }

    /// A pre-release that also carries a post or dev segment, e.g. `1.0a1.post2`.
    /// These have no faithful recipe representation.
    pub fn is_compound_prerelease(&self) -> bool {
        self.pre.is_some() && (self.post.is_some() || self.dev.is_some())
    }

    /// Epoch and release only
    pub fn base(&self) -> Version {
        Version {
            epoch: self.epoch,
            release: self.release.clone(),
            pre: None,
            post: None,
            dev: None,
        }
    }

    /// The first `n` release segments (at least one), without any suffix
    pub fn truncated(&self, n: usize) -> Version {
        let n = n.clamp(1, self.release.len());
        Version {
            epoch: self.epoch,
            release: self.release[..n].to_vec(),
            pre: None,
            post: None,
            dev: None,
        }
    }

    /// Release-only version extended with zeros up to `len` segments
    pub fn zero_padded(&self, len: usize) -> Version {
        let mut release = self.release.clone();
        if release.len() < len {
            release.resize(len, 0);
        }
        Version {
            epoch: self.epoch,
            release,
            pre: None,
            post: None,
            dev: None,
        }
    }

    /// This release with `.dev0` appended (`1.0` → `1.0.dev0`). In recipe
    /// order it sorts right above the release and below its post-releases
    /// and patch releases.
    pub fn dev_successor(&self) -> Version {
        Version {
            epoch: self.epoch,
            release: self.release.clone(),
            pre: None,
            post: None,
            dev: Some(0),
        }
    }

    /// Whether this version, used as an inclusive recipe upper bound, also
    /// admits `other` as a sub-version: its recipe components start with
    /// ours. `4.2` is a prefix of `4.2`, `4.2.7`, `4.2.dev0` and
    /// `4.2.1rc1`; `4.2.0` is not a prefix of `4.2`. Pre-releases never
    /// act as prefixes.
    pub fn is_prefix_of(&self, other: &Version) -> bool {
        if self.pre.is_some() {
            return false;
        }
        let prefix = self.components();
        let components = other.components();
        components.len() >= prefix.len() && components[..prefix.len()] == prefix[..]
    }

    /// Recipe-format comparison: components first, then the pre-release
    /// rank. Versions the recipe format cannot tell apart (`2!1.0` and
    /// `2.1.0`, or `1.0a1.post1` and `1.0a1`) compare equal.
    pub fn recipe_cmp(&self, other: &Version) -> Ordering {
        self.components()
            .cmp(&other.components())
            .then_with(|| self.pre_rank().cmp(&other.pre_rank()))
    }

    /// Epoch folded into the leading component, then the release, then
    /// `post`/`dev` labels. Post and dev segments of pre-releases are
    /// dropped, they have no recipe form.
    fn components(&self) -> Vec<Component> {
        let mut out = Vec::with_capacity(self.release.len() + 5);
        if self.epoch > 0 {
            out.push(Component::Number(self.epoch));
        }
        out.extend(self.release.iter().map(|n| Component::Number(*n)));
        if self.pre.is_none() {
            if let Some(n) = self.post {
                out.extend([Component::Label("post"), Component::Number(n)]);
            }
            if let Some(n) = self.dev {
                out.extend([Component::Label("dev"), Component::Number(n)]);
            }
        }
        out
    }

    fn pre_rank(&self) -> (u8, u64) {
        match self.pre {
            Some((kind, n)) => (kind as u8, n),
            None => (FINAL_RANK, 0),
        }
    }

    /// PEP 440 comparison: release segments are zero-padded, so `4.2`
    /// and `4.2.0` compare equal here while [`Ord`] still separates them.
    pub fn pep440_cmp(&self, other: &Version) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| compare_release(&self.release, &other.release))
            .then_with(|| self.phase_key().cmp(&other.phase_key()))
            .then_with(|| self.post.cmp(&other.post))
            .then_with(|| dev_key(self.dev).cmp(&dev_key(other.dev)))
    }

    /// Rendering used in recipes: `1.2.3`, `1.2.3-alpha1`, `1.2.post1`.
    /// The recipe format has no epochs; a non-zero epoch becomes the
    /// leading release component (`2!1.0` → `2.1.0`).
    pub fn target(&self) -> String {
        let mut out = String::new();
        if self.epoch > 0 {
            out.push_str(&format!("{}.", self.epoch));
        }
        out.push_str(&join_release(&self.release));
        if let Some((kind, n)) = self.pre {
            out.push_str(&format!("-{}{}", kind.long(), n));
        }
        if let Some(n) = self.post {
            out.push_str(&format!(".post{}", n));
        }
        if let Some(n) = self.dev {
            out.push_str(&format!(".dev{}", n));
        }
        out
    }

    fn phase_key(&self) -> PhaseKey {
        match self.pre {
            Some((kind, n)) => PhaseKey::Pre(kind, n),
            None if self.post.is_none() && self.dev.is_some() => PhaseKey::DevOnly,
            None => PhaseKey::Final,
        }
    }
}

fn dev_key(dev: Option<u64>) -> (bool, u64) {
    (dev.is_none(), dev.unwrap_or(0))
}

fn compare_release(a: &[u64], b: &[u64]) -> Ordering {
    let len = a.len().max(b.len());
    (0..len)
        .map(|i| {
            let x = a.get(i).copied().unwrap_or(0);
            let y = b.get(i).copied().unwrap_or(0);
            x.cmp(&y)
        })
        .find(|ord| *ord != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}

fn join_release(release: &[u64]) -> String {
    release
        .iter()
        .map(|seg| seg.to_string())
        .collect::<Vec<_>>()
        .join(".")
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.pep440_cmp(other)
            .then_with(|| self.release.len().cmp(&other.release.len()))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.epoch > 0 {
            write!(f, "{}!", self.epoch)?;
        }
        f.write_str(&join_release(&self.release))?;
        if let Some((kind, n)) = self.pre {
            write!(f, "{}{}", kind.short(), n)?;
        }
        if let Some(n) = self.post {
            write!(f, ".post{}", n)?;
        }
        if let Some(n) = self.dev {
            write!(f, ".dev{}", n)?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::parse(s)
    }
}

impl From<Version> for String {
    fn from(v: Version) -> Self {
        v.to_string()
    }
}

impl TryFrom<String> for Version {
    type Error = ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Version::parse(&s)
    }
}
