//! Extraction policy configuration.

/// Upper bound on how many leading bytes an engine may inspect while probing
/// signatures during open (8 MiB).
pub const DEFAULT_PROBE_BOUND: u64 = 1 << 23;

/// Executable-image extension. Never treated as an archive, whatever the
/// engine registers and whatever the configured exclusions say.
pub const EXECUTABLE_EXTENSION: &str = "exe";

/// Policy knobs for resolving and extracting archives.
///
/// # Examples
///
/// ```
/// use arkive_core::ExtractionConfig;
///
/// let config = ExtractionConfig::default();
/// assert!(config.is_extension_excluded("EXE"));
///
/// let custom = ExtractionConfig {
///     preserve_mtime: false,
///     ..Default::default()
/// };
/// assert!(!custom.preserve_mtime);
/// ```
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    /// Maximum number of leading bytes scanned while opening an archive.
    pub probe_bound: u64,

    /// Additional extensions never treated as archives, even when an engine
    /// registers them. [`EXECUTABLE_EXTENSION`] is always excluded.
    pub excluded_extensions: Vec<String>,

    /// Apply entry modification times to extracted files.
    pub preserve_mtime: bool,

    /// Fail entries whose path is absolute or climbs out of the output root.
    ///
    /// When disabled, such components are stripped instead.
    pub reject_unsafe_paths: bool,
}

impl Default for ExtractionConfig {
    /// Default values:
    /// - `probe_bound`: 8 MiB
    /// - `excluded_extensions`: empty (only `exe`)
    /// - `preserve_mtime`: true
    /// - `reject_unsafe_paths`: true
    fn default() -> Self {
        Self {
            probe_bound: DEFAULT_PROBE_BOUND,
            excluded_extensions: Vec::new(),
            preserve_mtime: true,
            reject_unsafe_paths: true,
        }
    }
}

impl ExtractionConfig {
    /// Configuration for archives from trusted sources.
    ///
    /// Unsafe path components are stripped rather than failing the entry.
    /// The executable exclusion is kept.
    #[must_use]
    pub fn trusted() -> Self {
        Self {
            reject_unsafe_paths: false,
            ..Default::default()
        }
    }

    /// Returns whether `ext` (already stripped of its dot) is excluded.
    ///
    /// Comparison is case-insensitive.
    #[must_use]
    pub fn is_extension_excluded(&self, extension: &str) -> bool {
        let folded = extension.to_lowercase();
        folded == EXECUTABLE_EXTENSION
            || self
                .excluded_extensions
                .iter()
                .any(|excluded| excluded.to_lowercase() == folded)
    }
}
