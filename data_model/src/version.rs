//! Module with [`Version`] of the Bot API supported by the host.

use std::{cmp::Ordering, fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::ValidationError;

/// Bot API version supported by the host, like `6.9` or `7.10`.
///
/// Components are compared numerically left to right, missing trailing components count as
/// zero. So `6.1 == 6.1.0` and `6.10 > 6.9`.
#[derive(Debug, Clone)]
pub struct Version(Vec<u32>);

impl Version {
    /// Version assumed when the host doesn't report any.
    pub const FALLBACK: &'static str = "6.0";

    /// Construct version from its major and minor components.
    #[must_use]
    pub fn new(major: u32, minor: u32) -> Self {
        Self(vec![major, minor])
    }

    /// Parse version reported by the host.
    ///
    /// Never fails: components which are not numbers become `0`
    /// and an empty string becomes [`Version::FALLBACK`].
    #[must_use]
    pub fn lossy(raw: &str) -> Self {
        let raw = raw.trim();
        let raw = if raw.is_empty() { Self::FALLBACK } else { raw };
        Self(
            raw.split('.')
                .map(|component| component.trim().parse().unwrap_or(0))
                .collect(),
        )
    }

    /// Components without trailing zeros.
    fn significant(&self) -> &[u32] {
        let len = self
            .0
            .iter()
            .rposition(|component| *component != 0)
            .map_or(0, |last| last.saturating_add(1));
        self.0.get(..len).unwrap_or_default()
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::lossy(Self::FALLBACK)
    }
}

impl FromStr for Version {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let components = s
            .split('.')
            .map(|component| component.parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_err| ValidationError::Version(s.to_owned()))?;
        Ok(Self(components))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut components = self.0.iter();
        if let Some(first) = components.next() {
            write!(f, "{first}")?;
        }
        for component in components {
            write!(f, ".{component}")?;
        }
        Ok(())
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.significant() == other.significant()
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        // Lexicographic comparison of slices treats a shorter prefix as smaller,
        // which is exactly zero-padding once trailing zeros are stripped.
        self.significant().cmp(other.significant())
    }
}

impl std::hash::Hash for Version {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.significant().hash(state);
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::lossy(&raw))
    }
}
