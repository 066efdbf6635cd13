//! Format descriptors and identifiers.

/// Capability flag bits an engine may advertise for a format.
///
/// The registry forwards flags verbatim; only [`MULTI_SIGNATURE`] is
/// interpreted, by [`FormatDescriptor::is_multi_signature`].
pub mod flags {
    /// Keep the original name when re-emitting a single-stream payload.
    pub const KEEP_NAME: u32 = 1 << 0;
    /// The format stores alternate data streams.
    pub const ALT_STREAMS: u32 = 1 << 1;
    /// The format stores NT security descriptors.
    pub const NT_SECURE: u32 = 1 << 2;
    /// The signature may appear at a non-zero offset.
    pub const FIND_SIGNATURE: u32 = 1 << 3;
    /// The format has more than one signature.
    pub const MULTI_SIGNATURE: u32 = 1 << 4;
    /// The structure is located from the end of the stream.
    pub const BACKWARD_OPEN: u32 = 1 << 8;
    /// The format can store symbolic links.
    pub const SYMLINKS: u32 = 1 << 10;
    /// The format can store hard links.
    pub const HARDLINKS: u32 = 1 << 11;
}

/// Opaque identifier the engine uses to instantiate a handler.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FormatId(Box<[u8]>);

impl FormatId {
    /// Wraps raw identifier bytes.
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into().into_boxed_slice())
    }

    /// Returns the identifier bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Display for FormatId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in self.0.iter() {
            write!(f, "{byte:02X}")?;
        }
        Ok(())
    }
}

/// Everything the registry knows about one format.
///
/// `extensions` and `add_extensions` are positionally aligned: slot `i` of
/// `add_extensions` is the alternate name suffix for `extensions[i]`, and an
/// empty slot means there is none.
///
/// # Examples
///
/// ```
/// use arkive_core::FormatDescriptor;
///
/// let gzip = FormatDescriptor::new("gzip")
///     .with_extensions("gz TGZ")
///     .with_add_extensions("* .tar");
///
/// assert_eq!(gzip.extensions(), ["gz", "tgz"]);
/// assert_eq!(gzip.add_extension_for("tgz"), Some(".tar"));
/// assert_eq!(gzip.add_extension_for("gz"), None);
/// assert!(!gzip.can_open());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatDescriptor {
    name: String,
    extensions: Vec<String>,
    add_extensions: Vec<String>,
    flags: u32,
    time_flags: u32,
    format_id: Option<FormatId>,
}

impl FormatDescriptor {
    /// Creates a descriptor with no extensions, no flags and no identifier.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extensions: Vec::new(),
            add_extensions: Vec::new(),
            flags: 0,
            time_flags: 0,
            format_id: None,
        }
    }

    /// Sets the extension list from a space-separated token string.
    #[must_use]
    pub fn with_extensions(mut self, list: &str) -> Self {
        self.extensions = tokenize(list);
        self.align_add_extensions();
        self
    }

    /// Sets the alternate extension list from a space-separated token string.
    ///
    /// A `*` token stands for an empty slot.
    #[must_use]
    pub fn with_add_extensions(mut self, list: &str) -> Self {
        self.add_extensions = tokenize(list)
            .into_iter()
            .map(|token| if token == "*" { String::new() } else { token })
            .collect();
        self.align_add_extensions();
        self
    }

    /// Sets the capability flags.
    #[must_use]
    pub const fn with_flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }

    /// Sets the timestamp flags.
    #[must_use]
    pub const fn with_time_flags(mut self, time_flags: u32) -> Self {
        self.time_flags = time_flags;
        self
    }

    /// Sets the handler identifier.
    #[must_use]
    pub fn with_format_id(mut self, id: FormatId) -> Self {
        self.format_id = Some(id);
        self
    }

    /// Unique, case-sensitive format name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lower-cased extension tokens, without dots.
    #[must_use]
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Alternate extensions aligned with [`extensions`](Self::extensions).
    #[must_use]
    pub fn add_extensions(&self) -> &[String] {
        &self.add_extensions
    }

    /// Returns the alternate extension registered for `extension`.
    #[must_use]
    pub fn add_extension_for(&self, extension: &str) -> Option<&str> {
        let folded = normalize_extension(extension);
        let slot = self.extensions.iter().position(|e| *e == folded)?;
        self.add_extensions
            .get(slot)
            .map(String::as_str)
            .filter(|alt| !alt.is_empty())
    }

    /// Opaque capability flags.
    #[must_use]
    pub const fn flags(&self) -> u32 {
        self.flags
    }

    /// Opaque timestamp flags.
    #[must_use]
    pub const fn time_flags(&self) -> u32 {
        self.time_flags
    }

    /// Identifier used to instantiate a handler, if the format can be opened.
    #[must_use]
    pub const fn format_id(&self) -> Option<&FormatId> {
        self.format_id.as_ref()
    }

    /// Returns `true` when the engine can instantiate a handler for this
    /// format.
    #[must_use]
    pub const fn can_open(&self) -> bool {
        self.format_id.is_some()
    }

    /// Returns `true` if the format advertises more than one signature.
    #[must_use]
    pub const fn is_multi_signature(&self) -> bool {
        self.flags & flags::MULTI_SIGNATURE != 0
    }

    /// Extension tokens joined with single spaces.
    #[must_use]
    pub fn extension_list(&self) -> String {
        self.extensions.join(" ")
    }

    /// Alternate extensions joined with single spaces, `*` for empty slots.
    ///
    /// Returns an empty string when no slot is set.
    #[must_use]
    pub fn add_extension_list(&self) -> String {
        if self.add_extensions.iter().all(String::is_empty) {
            return String::new();
        }
        self.add_extensions
            .iter()
            .map(|alt| if alt.is_empty() { "*" } else { alt.as_str() })
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn align_add_extensions(&mut self) {
        if self.add_extensions.is_empty() || self.extensions.is_empty() {
            return;
        }
        self.add_extensions
            .resize(self.extensions.len(), String::new());
    }
}

/// Strips one leading dot and lower-cases the remainder.
///
/// Lower-casing is full Unicode case mapping, so `"ÄRJ"` and `"ärj"` are the
/// same token. The operation is idempotent apart from the dot strip.
///
/// # Examples
///
/// ```
/// use arkive_core::registry::normalize_extension;
///
/// assert_eq!(normalize_extension(".ZIP"), "zip");
/// assert_eq!(normalize_extension("tar"), "tar");
/// assert_eq!(normalize_extension("."), "");
/// ```
#[must_use]
pub fn normalize_extension(extension: &str) -> String {
    extension
        .strip_prefix('.')
        .unwrap_or(extension)
        .to_lowercase()
}

/// Splits a space-separated list, dropping empty tokens and lower-casing.
pub(crate) fn tokenize(list: &str) -> Vec<String> {
    list.split(' ')
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}
