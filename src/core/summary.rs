//! Summary - lightweight manifest for resolution.
//!
//! A Summary contains just enough information for dependency resolution:
//! package identity, dependencies, and the capabilities the package declares.
//! It's designed to be cheap to clone.

use std::sync::Arc;

use semver::Version;

use crate::core::capability::Capabilities;
use crate::core::{Dependency, PackageId, SourceId};
use crate::util::InternedString;

/// A lightweight package summary for resolution.
///
/// Summaries are Arc-wrapped internally for cheap cloning.
#[derive(Clone)]
pub struct Summary {
    inner: Arc<SummaryInner>,
}

#[derive(Clone)]
struct SummaryInner {
    package_id: PackageId,
    dependencies: Vec<Dependency>,
    checksum: Option<String>,
    capabilities: Capabilities,
}

impl Summary {
    /// Create a new summary.
    pub fn new(
        package_id: PackageId,
        dependencies: Vec<Dependency>,
        checksum: Option<String>,
    ) -> Self {
        Summary {
            inner: Arc::new(SummaryInner {
                package_id,
                dependencies,
                checksum,
                capabilities: Capabilities::default(),
            }),
        }
    }

    /// Attach the capabilities declared by the package manifest.
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        let inner = Arc::make_mut(&mut self.inner);
        inner.capabilities = capabilities;
        self
    }

    /// Get the package ID.
    pub fn package_id(&self) -> PackageId {
        self.inner.package_id
    }

    /// Get the package name.
    pub fn name(&self) -> InternedString {
        self.inner.package_id.name()
    }

    /// Get the package version.
    pub fn version(&self) -> &Version {
        self.inner.package_id.version()
    }

    /// Get the source ID.
    pub fn source_id(&self) -> SourceId {
        self.inner.package_id.source_id()
    }

    /// Get the dependencies.
    pub fn dependencies(&self) -> &[Dependency] {
        &self.inner.dependencies
    }

    /// Get the checksum.
    pub fn checksum(&self) -> Option<&str> {
        self.inner.checksum.as_deref()
    }

    /// Get the declared capabilities.
    pub fn capabilities(&self) -> Capabilities {
        self.inner.capabilities
    }

    /// Map dependencies to a new list.
    pub fn map_dependencies<F>(mut self, f: F) -> Self
    where
        F: FnMut(Dependency) -> Dependency,
    {
        let inner = Arc::make_mut(&mut self.inner);
        inner.dependencies = inner.dependencies.drain(..).map(f).collect();
        self
    }
}

impl std::fmt::Debug for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Summary")
            .field("package_id", &self.inner.package_id)
            .field("dependencies", &self.inner.dependencies.len())
            .field("checksum", &self.inner.checksum)
            .field("capabilities", &self.inner.capabilities)
            .finish()
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner.package_id)
    }
}

impl PartialEq for Summary {
    fn eq(&self, other: &Self) -> bool {
        self.inner.package_id == other.inner.package_id
    }
}

impl Eq for Summary {}

impl std::hash::Hash for Summary {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.inner.package_id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_summary_creation() {
        let tmp = TempDir::new().unwrap();
        let source = SourceId::for_path(tmp.path()).unwrap();
        let pkg_id = PackageId::new("test", Version::new(1, 0, 0), source);

        let summary = Summary::new(pkg_id, vec![], Some("abc123".into()));

        assert_eq!(summary.name().as_str(), "test");
        assert_eq!(summary.version(), &Version::new(1, 0, 0));
        assert_eq!(summary.checksum(), Some("abc123"));
        assert!(!summary.capabilities().any());
    }

    #[test]
    fn test_summary_cheap_clone() {
        let tmp = TempDir::new().unwrap();
        let source = SourceId::for_path(tmp.path()).unwrap();
        let pkg_id = PackageId::new("test", Version::new(1, 0, 0), source);

        let summary1 = Summary::new(pkg_id, vec![], None);
        let summary2 = summary1.clone();

        assert!(Arc::ptr_eq(&summary1.inner, &summary2.inner));
    }

    #[test]
    fn test_summary_with_capabilities() {
        use crate::core::capability::Capabilities;

        let tmp = TempDir::new().unwrap();
        let source = SourceId::for_path(tmp.path()).unwrap();
        let pkg_id = PackageId::new("test", Version::new(1, 0, 0), source);

        let summary = Summary::new(pkg_id, vec![], None).with_capabilities(Capabilities {
            mcp: true,
            ..Default::default()
        });

        assert!(summary.capabilities().mcp);
        assert!(summary.capabilities().any());
    }
}
