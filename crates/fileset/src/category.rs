use std::cmp::Ordering;
use std::fmt;

/// Maven metadata file name prefixes (lowercase).
const MAVEN_METADATA_PREFIXES: [&str; 2] = ["maven-metadata.xml", "maven-metadata-local.xml"];

/// Deployment category of a file.
///
/// Categories are deployed in [`priority`](Category::priority) order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// The main artifact of a directory (`foo.jar` when the root is `foo`).
    Primary,
    /// A `.pom` file.
    Pom,
    /// An `.asc` signature.
    Signature,
    /// `maven-metadata.xml` and friends.
    MavenMetadata,
    /// Anything else (sources, javadoc, ...).
    Additional,
}

impl Category {
    /// All categories in deploy order.
    pub const ALL: [Category; 5] = [
        Category::Primary,
        Category::Pom,
        Category::Signature,
        Category::MavenMetadata,
        Category::Additional,
    ];

    /// Deploy priority, lowest first.
    pub fn priority(self) -> u8 {
        match self {
            Self::Primary => 0,
            Self::Pom => 1,
            Self::Signature => 2,
            Self::MavenMetadata => 3,
            Self::Additional => 4,
        }
    }

    /// Categorizes a file name given its directory's root name.
    pub fn of(file_name: &str, root: Option<&str>) -> Self {
        if file_name.ends_with(".pom") {
            Self::Pom
        } else if file_name.ends_with(".asc") {
            Self::Signature
        } else if is_maven_metadata(file_name) {
            Self::MavenMetadata
        } else if root.is_some_and(|root| name_without_extension(file_name) == root) {
            Self::Primary
        } else {
            Self::Additional
        }
    }
}

impl Ord for Category {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority().cmp(&other.priority())
    }
}

impl PartialOrd for Category {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Primary => "primary",
            Self::Pom => "pom",
            Self::Signature => "signature",
            Self::MavenMetadata => "maven-metadata",
            Self::Additional => "additional",
        };
        f.write_str(name)
    }
}

/// Returns `true` for `maven-metadata.xml`, `maven-metadata-local.xml` and
/// their checksum/signature companions.
pub fn is_maven_metadata(file_name: &str) -> bool {
    let lower = file_name.to_ascii_lowercase();
    MAVEN_METADATA_PREFIXES
        .iter()
        .any(|prefix| lower.starts_with(prefix))
}

/// File name up to (excluding) the last `.`.
pub(crate) fn name_without_extension(file_name: &str) -> &str {
    file_name
        .rsplit_once('.')
        .map_or(file_name, |(stem, _)| stem)
}

/// File name after the last `.`, empty when there is none.
pub(crate) fn extension(file_name: &str) -> &str {
    file_name.rsplit_once('.').map_or("", |(_, ext)| ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pom_wins_over_root_match() {
        assert_eq!(Category::of("foo.pom", Some("foo")), Category::Pom);
    }

    #[test]
    fn signature_detected() {
        assert_eq!(Category::of("foo.jar.asc", Some("foo")), Category::Signature);
        assert_eq!(Category::of("foo.pom.asc", Some("foo")), Category::Signature);
    }

    #[test]
    fn metadata_detected_case_insensitively() {
        assert_eq!(Category::of("maven-metadata.xml", Some("foo")), Category::MavenMetadata);
        assert_eq!(
            Category::of("Maven-Metadata-Local.xml.sha1", None),
            Category::MavenMetadata
        );
    }

    #[test]
    fn primary_requires_root_match() {
        assert_eq!(Category::of("foo.jar", Some("foo")), Category::Primary);
        assert_eq!(Category::of("foo-sources.jar", Some("foo")), Category::Additional);
        assert_eq!(Category::of("foo.jar", None), Category::Additional);
    }

    #[test]
    fn priority_table_orders_categories() {
        let mut shuffled = vec![
            Category::Additional,
            Category::Signature,
            Category::Primary,
            Category::MavenMetadata,
            Category::Pom,
        ];
        shuffled.sort();
        assert_eq!(shuffled, Category::ALL.to_vec());
    }

    #[test]
    fn splits_names() {
        assert_eq!(name_without_extension("foo-1.0.tar.gz"), "foo-1.0.tar");
        assert_eq!(extension("foo-1.0.tar.gz"), "gz");
        assert_eq!(name_without_extension("README"), "README");
        assert_eq!(extension("README"), "");
    }
}
