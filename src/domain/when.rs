//! When-conditions attached to dependency entries
//!
//! A [`WhenCondition`] is a pure conjunction: an optional platform, a
//! runtime (interpreter) range, variant polarities and a range over the
//! host package's own versions. Disjunctive markers are expanded into
//! several conditions before they get here.

use super::TargetRange;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Platforms the recipe format can condition on
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    Cray,
    Darwin,
    Windows,
    Freebsd,
}

impl Platform {
    pub const ALL: [Platform; 5] = [
        Platform::Linux,
        Platform::Cray,
        Platform::Darwin,
        Platform::Windows,
        Platform::Freebsd,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Linux => "linux",
            Platform::Cray => "cray",
            Platform::Darwin => "darwin",
            Platform::Windows => "windows",
            Platform::Freebsd => "freebsd",
        }
    }

    /// Map a `sys_platform` value
    pub fn from_sys_platform(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "linux" | "linux2" => Some(Platform::Linux),
            "cray" => Some(Platform::Cray),
            "darwin" => Some(Platform::Darwin),
            "win32" | "windows" | "cygwin" => Some(Platform::Windows),
            "freebsd" => Some(Platform::Freebsd),
            _ => None,
        }
    }

    /// Map a `platform_system` value (`Linux`, `Darwin`, `Windows`, ...)
    pub fn from_system(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "linux" => Some(Platform::Linux),
            "darwin" => Some(Platform::Darwin),
            "windows" => Some(Platform::Windows),
            "freebsd" => Some(Platform::Freebsd),
            _ => None,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Conjunction of environment and host-version constraints
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct WhenCondition {
    /// Range over the host package's own versions
    pub host: TargetRange,
    /// `true` is `+variant`, `false` is `~variant`
    pub variants: BTreeMap<String, bool>,
    pub platform: Option<Platform>,
    /// Range over the interpreter's versions
    pub runtime: TargetRange,
}

impl WhenCondition {
    /// Condition that always holds
    pub fn always() -> Self {
        Self::default()
    }

    pub fn is_unconstrained(&self) -> bool {
        self.host.is_any()
            && self.variants.is_empty()
            && self.platform.is_none()
            && self.runtime.is_any()
    }

    /// Same condition restricted to the given host range
    pub fn with_host(mut self, host: TargetRange) -> Self {
        self.host = host;
        self
    }

    /// Variants this condition requires to be enabled
    pub fn enabled_variants(&self) -> impl Iterator<Item = &str> {
        self.variants
            .iter()
            .filter(|(_, on)| **on)
            .map(|(name, _)| name.as_str())
    }

    /// Whether some build configuration satisfies both conditions
    pub fn intersects(&self, other: &WhenCondition) -> bool {
        let platforms_agree = match (self.platform, other.platform) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        };
        let variants_agree = self
            .variants
            .iter()
            .all(|(name, on)| other.variants.get(name).map_or(true, |theirs| theirs == on));
        platforms_agree
            && variants_agree
            && self.runtime.intersects(&other.runtime)
            && self.host.intersects(&other.host)
    }
}

impl fmt::Display for WhenCondition {
    /// Recipe spelling, e.g. `@1.0:1.4 +cli ~gui platform=linux ^python@3.8:`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if !self.host.is_any() {
            parts.push(format!("@{}", self.host));
        }
        for (name, on) in &self.variants {
            parts.push(format!("{}{}", if *on { '+' } else { '~' }, name));
        }
        if let Some(platform) = self.platform {
            parts.push(format!("platform={}", platform));
        }
        if !self.runtime.is_any() {
            parts.push(format!("^python@{}", self.runtime));
        }
        f.write_str(&parts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(s: &str) -> TargetRange {
        s.parse().unwrap()
    }

    #[test]
    fn test_platform_mapping() {
        assert_eq!(Platform::from_sys_platform("linux2"), Some(Platform::Linux));
        assert_eq!(Platform::from_sys_platform("win32"), Some(Platform::Windows));
        assert_eq!(Platform::from_sys_platform("emscripten"), None);
        assert_eq!(Platform::from_system("Darwin"), Some(Platform::Darwin));
    }

    #[test]
    fn test_display() {
        let mut when = WhenCondition::always().with_host(r("1.0:1.4"));
        when.variants.insert("gui".to_string(), false);
        when.variants.insert("cli".to_string(), true);
        when.platform = Some(Platform::Linux);
        when.runtime = r("3.8:");
        assert_eq!(when.to_string(), "@1.0:1.4 +cli ~gui platform=linux ^python@3.8:");
    }

    #[test]
    fn test_unconstrained_renders_empty() {
        let when = WhenCondition::always();
        assert!(when.is_unconstrained());
        assert_eq!(when.to_string(), "");
    }

    #[test]
    fn test_intersects_platform() {
        let mut linux = WhenCondition::always();
        linux.platform = Some(Platform::Linux);
        let mut darwin = WhenCondition::always();
        darwin.platform = Some(Platform::Darwin);
        assert!(!linux.intersects(&darwin));
        assert!(linux.intersects(&WhenCondition::always()));
    }

    #[test]
    fn test_intersects_variant_polarity() {
        let mut on = WhenCondition::always();
        on.variants.insert("x".to_string(), true);
        let mut off = WhenCondition::always();
        off.variants.insert("x".to_string(), false);
        let mut other = WhenCondition::always();
        other.variants.insert("y".to_string(), true);
        assert!(!on.intersects(&off));
        assert!(on.intersects(&other));
    }

    #[test]
    fn test_intersects_host_ranges() {
        let a = WhenCondition::always().with_host(r("12:15"));
        let b = WhenCondition::always().with_host(r("14:18"));
        let c = WhenCondition::always().with_host(r("16:"));
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }
}
