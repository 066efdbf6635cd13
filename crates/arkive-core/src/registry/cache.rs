//! Build-once registry cache.

use std::sync::OnceLock;

use super::FormatRegistry;
use crate::engine::ArchiveEngine;
use crate::engine::BuiltinEngine;

/// Holds a [`FormatRegistry`] that is built at most once.
///
/// Racing callers of [`get_or_build`](Self::get_or_build) all observe the
/// same registry; the build runs exactly once. Reads after initialization
/// take no lock.
///
/// # Examples
///
/// ```
/// use arkive_core::BuiltinEngine;
/// use arkive_core::RegistryCache;
///
/// static REGISTRY: RegistryCache = RegistryCache::new();
///
/// let registry = REGISTRY.get_or_build(&BuiltinEngine::new());
/// assert!(registry.is_supported("zip"));
/// assert!(REGISTRY.get().is_some());
/// ```
#[derive(Debug, Default)]
pub struct RegistryCache {
    cell: OnceLock<FormatRegistry>,
}

impl RegistryCache {
    /// Creates an empty cache.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cell: OnceLock::new(),
        }
    }

    /// Returns the cached registry, building it from `engine` on first use.
    pub fn get_or_build(&self, engine: &dyn ArchiveEngine) -> &FormatRegistry {
        self.cell.get_or_init(|| FormatRegistry::build(engine))
    }

    /// Returns the registry if it has been built.
    #[must_use]
    pub fn get(&self) -> Option<&FormatRegistry> {
        self.cell.get()
    }
}

static BUILTIN: RegistryCache = RegistryCache::new();

/// Process-wide registry over the [`BuiltinEngine`].
pub fn builtin_registry() -> &'static FormatRegistry {
    BUILTIN.get_or_build(&BuiltinEngine::new())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::test_utils::MockEngine;
    use crate::test_utils::MockFormat;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    #[test]
    fn test_builds_once() {
        let cache = RegistryCache::new();
        assert!(cache.get().is_none());

        let first = cache.get_or_build(&MockEngine::new().with_format(MockFormat::new("A", "a")));
        let second = cache.get_or_build(&MockEngine::new().with_format(MockFormat::new("B", "b")));
        assert!(std::ptr::eq(first, second));
        assert!(second.is_supported("a"));
        assert!(!second.is_supported("b"));
    }

    #[test]
    fn test_racing_initialization_builds_once() {
        let cache = Arc::new(RegistryCache::new());
        let engine = Arc::new(MockEngine::new().with_format(MockFormat::new("A", "a")));
        let builds = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let engine = Arc::clone(&engine);
                let builds = Arc::clone(&builds);
                std::thread::spawn(move || {
                    let registry = cache.get_or_build(engine.as_ref());
                    if registry.is_supported("a") {
                        builds.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(builds.load(Ordering::SeqCst), 8);
        assert_eq!(engine.format_count_calls(), 1);
    }

    #[test]
    fn test_builtin_registry_is_shared() {
        let a = builtin_registry();
        let b = builtin_registry();
        assert!(std::ptr::eq(a, b));
        assert!(a.is_supported("7z"));
    }
}
