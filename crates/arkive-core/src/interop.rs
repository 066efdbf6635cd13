//! Fixed-size format records for callers across a foreign-function boundary.
//!
//! Text fields are NUL-terminated UTF-16 in fixed buffers. Text that does not
//! fit is cut at the last whole character that leaves room for the
//! terminator (surrogate pairs are never split) and the record's
//! `truncated` flag is set.

use crate::registry::FormatDescriptor;
use crate::registry::FormatRegistry;

/// Capacity of [`FormatInfoRecord::name`] in UTF-16 code units, including
/// the terminator.
pub const NAME_CAPACITY: usize = 64;

/// Capacity of the extension list buffers in UTF-16 code units, including
/// the terminator.
pub const LIST_CAPACITY: usize = 256;

/// Length of a class id.
pub const CLASS_ID_LEN: usize = 16;

/// A format descriptor flattened into fixed buffers.
///
/// # Examples
///
/// ```
/// use arkive_core::FormatDescriptor;
/// use arkive_core::interop::FormatInfoRecord;
///
/// let desc = FormatDescriptor::new("gzip").with_extensions("gz tgz");
/// let record = FormatInfoRecord::from_descriptor(&desc);
/// assert_eq!(record.name(), "gzip");
/// assert_eq!(record.extensions(), "gz tgz");
/// assert!(!record.truncated);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatInfoRecord {
    /// Format name.
    pub name: [u16; NAME_CAPACITY],
    /// Space-separated extension list.
    pub extensions: [u16; LIST_CAPACITY],
    /// Space-separated add-extension list, `*` for empty slots.
    pub add_extensions: [u16; LIST_CAPACITY],
    /// Class id, zero-filled when the format has none.
    pub class_id: [u8; CLASS_ID_LEN],
    /// Set when any text field or the class id was cut short.
    pub truncated: bool,
}

impl FormatInfoRecord {
    /// Flattens `descriptor`.
    #[must_use]
    pub fn from_descriptor(descriptor: &FormatDescriptor) -> Self {
        let mut record = Self {
            name: [0; NAME_CAPACITY],
            extensions: [0; LIST_CAPACITY],
            add_extensions: [0; LIST_CAPACITY],
            class_id: [0; CLASS_ID_LEN],
            truncated: false,
        };

        let mut truncated = encode_utf16z(descriptor.name(), &mut record.name);
        truncated |= encode_utf16z(&descriptor.extension_list(), &mut record.extensions);
        truncated |= encode_utf16z(&descriptor.add_extension_list(), &mut record.add_extensions);

        if let Some(id) = descriptor.format_id() {
            let bytes = id.as_bytes();
            let len = bytes.len().min(CLASS_ID_LEN);
            record.class_id[..len].copy_from_slice(&bytes[..len]);
            truncated |= bytes.len() > CLASS_ID_LEN;
        }

        record.truncated = truncated;
        record
    }

    /// Decoded name.
    #[must_use]
    pub fn name(&self) -> String {
        decode_utf16z(&self.name)
    }

    /// Decoded extension list.
    #[must_use]
    pub fn extensions(&self) -> String {
        decode_utf16z(&self.extensions)
    }

    /// Decoded add-extension list.
    #[must_use]
    pub fn add_extensions(&self) -> String {
        decode_utf16z(&self.add_extensions)
    }
}

/// Looks up a format by name or extension and flattens it.
#[must_use]
pub fn lookup_record(registry: &FormatRegistry, name_or_extension: &str) -> Option<FormatInfoRecord> {
    registry
        .lookup(name_or_extension)
        .map(FormatInfoRecord::from_descriptor)
}

/// All format names, sorted and joined by single spaces.
#[must_use]
pub fn joined_format_names(registry: &FormatRegistry) -> String {
    let mut names = registry.format_names();
    names.sort_unstable();
    names.join(" ")
}

/// Writes `text` into `buf` as NUL-terminated UTF-16. Returns `true` if
/// the text had to be cut.
fn encode_utf16z(text: &str, buf: &mut [u16]) -> bool {
    buf.fill(0);
    let Some(room) = buf.len().checked_sub(1) else {
        return !text.is_empty();
    };

    let mut written = 0;
    let mut units = [0u16; 2];
    for ch in text.chars() {
        let encoded = ch.encode_utf16(&mut units);
        if written + encoded.len() > room {
            return true;
        }
        buf[written..written + encoded.len()].copy_from_slice(encoded);
        written += encoded.len();
    }
    false
}

fn decode_utf16z(buf: &[u16]) -> String {
    let end = buf.iter().position(|&unit| unit == 0).unwrap_or(buf.len());
    String::from_utf16_lossy(&buf[..end])
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::registry::FormatId;

    #[test]
    fn test_exact_fit_is_not_truncated() {
        let name = "n".repeat(NAME_CAPACITY - 1);
        let record = FormatInfoRecord::from_descriptor(&FormatDescriptor::new(name.clone()));
        assert_eq!(record.name(), name);
        assert_eq!(record.name[NAME_CAPACITY - 1], 0);
        assert!(!record.truncated);
    }

    #[test]
    fn test_overflow_is_truncated() {
        let name = "n".repeat(NAME_CAPACITY);
        let record = FormatInfoRecord::from_descriptor(&FormatDescriptor::new(name));
        assert_eq!(record.name().len(), NAME_CAPACITY - 1);
        assert!(record.truncated);
    }

    #[test]
    fn test_surrogate_pair_not_split() {
        // 62 ASCII units leave one slot before the terminator, too small for
        // a two-unit character.
        let name = format!("{}\u{1F4E6}", "a".repeat(NAME_CAPACITY - 2));
        let record = FormatInfoRecord::from_descriptor(&FormatDescriptor::new(name));
        assert_eq!(record.name(), "a".repeat(NAME_CAPACITY - 2));
        assert!(record.truncated);
    }

    #[test]
    fn test_long_extension_list() {
        let list: Vec<String> = (0..100).map(|i| format!("e{i}")).collect();
        let desc = FormatDescriptor::new("many").with_extensions(&list.join(" "));
        let record = FormatInfoRecord::from_descriptor(&desc);
        assert!(record.truncated);
        assert!(record.extensions().len() < LIST_CAPACITY);
        assert!(list.join(" ").starts_with(&record.extensions()));
    }

    #[test]
    fn test_class_id_copied() {
        let desc = FormatDescriptor::new("x").with_format_id(FormatId::new(vec![7u8; 16]));
        let record = FormatInfoRecord::from_descriptor(&desc);
        assert_eq!(record.class_id, [7u8; 16]);
        assert!(!record.truncated);
    }

    #[test]
    fn test_joined_names() {
        let registry = FormatRegistry::from_descriptors([
            FormatDescriptor::new("zip").with_extensions("zip"),
            FormatDescriptor::new("7z").with_extensions("7z"),
        ]);
        assert_eq!(joined_format_names(&registry), "7z zip");
        assert_eq!(lookup_record(&registry, "ZIP").unwrap().name(), "zip");
        assert!(lookup_record(&registry, "rar").is_none());
    }
}
