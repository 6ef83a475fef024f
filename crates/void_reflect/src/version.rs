//! Archive versioning
//!
//! Every archive starts with a [`Version`] record naming the software that
//! wrote it. Readers compare it to [`Version::current`] to decide whether
//! elements need an upgrade pass.

use crate::composite::Compositor;
use crate::field::FieldFlags;
use crate::object::Reflect;
use core::fmt;

/// Source identifier written at the top of each archive
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Version {
    pub source: String,
    pub source_version: String,
}

impl Version {
    /// Source name used by this crate
    pub const SOURCE: &'static str = "void_reflect";

    pub fn new(source: impl Into<String>, source_version: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            source_version: source_version.into(),
        }
    }

    /// The version this build writes
    pub fn current() -> Self {
        Self::new(Self::SOURCE, env!("CARGO_PKG_VERSION"))
    }

    /// Check if both versions name the same source and release
    pub fn is_current_for(&self, other: &Version) -> bool {
        self.source == other.source && self.source_version == other.source_version
    }

    /// Check against [`Version::current`]
    pub fn is_current(&self) -> bool {
        self.is_current_for(&Self::current())
    }

    /// Parse `source_version` as "major.minor.patch"
    pub fn numeric(&self) -> Option<(u16, u16, u16)> {
        let mut parts = self.source_version.split('.');
        let major = parts.next()?.parse().ok()?;
        let minor = parts.next()?.parse().ok()?;
        let patch = parts.next()?.trim_end_matches(|c: char| !c.is_ascii_digit()).parse().ok()?;
        Some((major, minor, patch))
    }
}

impl Reflect for Version {
    const NAME: &'static str = "Version";

    fn enumerate(comp: &mut Compositor<Self>) {
        comp.field("m_Source", |v| &v.source, |v| &mut v.source)
            .flags(FieldFlags::FORCE);
        comp.field("m_SourceVersion", |v| &v.source_version, |v| &mut v.source_version)
            .flags(FieldFlags::FORCE);
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.source, self.source_version)
    }
}

impl fmt::Debug for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Version({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current() {
        let current = Version::current();
        assert!(current.is_current());
        assert_eq!(current.source, "void_reflect");
        assert!(!Version::new("void_reflect", "0.0.0-old").is_current());
        assert!(!Version::new("other", env!("CARGO_PKG_VERSION")).is_current());
    }

    #[test]
    fn test_numeric() {
        assert_eq!(Version::new("x", "1.2.3").numeric(), Some((1, 2, 3)));
        assert_eq!(Version::new("x", "0.4.10-beta").numeric(), Some((0, 4, 10)));
        assert_eq!(Version::new("x", "garbage").numeric(), None);
    }
}
