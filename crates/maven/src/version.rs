use std::sync::LazyLock;

use regex_lite::Regex;

/// Literal suffix of a declared snapshot version.
pub(crate) const SNAPSHOT_SUFFIX: &str = "-SNAPSHOT";

/// Token that marks an unresolved snapshot.
pub(crate) const SNAPSHOT_TOKEN: &str = "SNAPSHOT";

/// `<prefix>-<yyyyMMdd>.<HHmmss>-<build>`
static TIMESTAMP_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^.+-\d{8}\.\d{6}-\d+$").unwrap());

/// Leading `<yyyyMMdd>.<HHmmss>-<build>` token of a classifier remainder.
pub(crate) static TIMESTAMP_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{8}\.\d{6}-\d+").unwrap());

/// Kind of Maven version.
///
/// `Snapshot` is the umbrella kind: a concrete version string never
/// classifies as it, but both snapshot flavours [`matches`](Self::matches) it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MavenVersionType {
    /// A release version (`1.0.0.RELEASE`).
    Fixed,
    /// Any snapshot.
    Snapshot,
    /// A snapshot that still ends with `SNAPSHOT`.
    RegularSnapshot,
    /// A snapshot resolved to a build timestamp (`1.0.0-20171005.194031-1`).
    TimestampSnapshot,
}

impl MavenVersionType {
    /// Classifies a version string.
    pub fn from_version(version: &str) -> Self {
        if version.ends_with(SNAPSHOT_TOKEN) {
            Self::RegularSnapshot
        } else if TIMESTAMP_VERSION.is_match(version) {
            Self::TimestampSnapshot
        } else {
            Self::Fixed
        }
    }

    /// Returns `true` if this type is, or is included in, `other`.
    pub fn matches(self, other: MavenVersionType) -> bool {
        match other {
            Self::Snapshot => self.is_snapshot(),
            _ => self == other,
        }
    }

    /// Returns `true` for every snapshot flavour.
    pub fn is_snapshot(self) -> bool {
        matches!(
            self,
            Self::Snapshot | Self::RegularSnapshot | Self::TimestampSnapshot
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_fixed_versions() {
        assert_eq!(
            MavenVersionType::from_version("1.0.0.RELEASE"),
            MavenVersionType::Fixed
        );
        assert_eq!(MavenVersionType::from_version("2.1"), MavenVersionType::Fixed);
    }

    #[test]
    fn classifies_regular_snapshots() {
        assert_eq!(
            MavenVersionType::from_version("1.0.0.BUILD-SNAPSHOT"),
            MavenVersionType::RegularSnapshot
        );
    }

    #[test]
    fn classifies_timestamp_snapshots() {
        assert_eq!(
            MavenVersionType::from_version("1.0.0.BUILD-20171005.194031-1"),
            MavenVersionType::TimestampSnapshot
        );
        assert_eq!(
            MavenVersionType::from_version("1.0.0-20171005.194031-12"),
            MavenVersionType::TimestampSnapshot
        );
    }

    #[test]
    fn timestamp_without_prefix_is_fixed() {
        assert_eq!(
            MavenVersionType::from_version("20171005.194031-1"),
            MavenVersionType::Fixed
        );
    }

    #[test]
    fn snapshot_umbrella_matches_both_flavours() {
        assert!(MavenVersionType::RegularSnapshot.matches(MavenVersionType::Snapshot));
        assert!(MavenVersionType::TimestampSnapshot.matches(MavenVersionType::Snapshot));
        assert!(!MavenVersionType::Fixed.matches(MavenVersionType::Snapshot));
        assert!(MavenVersionType::Fixed.matches(MavenVersionType::Fixed));
        assert!(!MavenVersionType::RegularSnapshot.matches(MavenVersionType::TimestampSnapshot));
    }
}
