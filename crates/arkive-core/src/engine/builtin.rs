//! The engine bundled with this crate.
//!
//! Advertises a fixed table of formats backed by the handlers in
//! [`crate::formats`].

use crate::error::EngineStatus;
use crate::formats::Codec;
use crate::formats::SevenZHandler;
use crate::formats::StreamHandler;
use crate::formats::TarHandler;
use crate::formats::ZipHandler;
use crate::formats::common::class_id;
use crate::registry::FormatId;
use crate::registry::flags;

use super::ArchiveEngine;
use super::ArchiveHandler;
use super::EngineResult;
use super::FormatProp;
use super::PropValue;

/// Timestamp precision flags reported through [`FormatProp::TimeFlags`].
pub mod time_flags {
    /// Stores 100 ns FILETIME values.
    pub const FILETIME: u32 = 1 << 0;
    /// Stores MS-DOS times (2 s resolution).
    pub const DOS: u32 = 1 << 1;
    /// Stores Unix seconds.
    pub const UNIX: u32 = 1 << 2;
}

#[derive(Debug, Clone, Copy)]
enum Kind {
    SevenZ,
    Zip,
    Tar,
    Stream(Codec),
}

struct FormatSpec {
    name: &'static str,
    extensions: &'static str,
    add_extensions: &'static str,
    flags: u32,
    time_flags: u32,
    handler: u8,
    kind: Kind,
}

const FORMATS: &[FormatSpec] = &[
    FormatSpec {
        name: "7z",
        extensions: "7z",
        add_extensions: "",
        flags: 0,
        time_flags: time_flags::FILETIME,
        handler: 0x07,
        kind: Kind::SevenZ,
    },
    FormatSpec {
        name: "zip",
        extensions: "zip z01 zipx jar xpi odt ods docx xlsx epub ipa appx",
        add_extensions: "",
        flags: flags::FIND_SIGNATURE,
        time_flags: time_flags::DOS,
        handler: 0x01,
        kind: Kind::Zip,
    },
    FormatSpec {
        name: "tar",
        extensions: "tar ova",
        add_extensions: "",
        flags: flags::SYMLINKS | flags::HARDLINKS,
        time_flags: time_flags::UNIX,
        handler: 0xEE,
        kind: Kind::Tar,
    },
    FormatSpec {
        name: "gzip",
        extensions: "gz gzip tgz tpz",
        add_extensions: "* * .tar .tar",
        flags: flags::KEEP_NAME,
        time_flags: time_flags::UNIX,
        handler: 0xEF,
        kind: Kind::Stream(Codec::Gzip),
    },
    FormatSpec {
        name: "bzip2",
        extensions: "bz2 bzip2 tbz2 tbz",
        add_extensions: "* * .tar .tar",
        flags: flags::KEEP_NAME,
        time_flags: 0,
        handler: 0x02,
        kind: Kind::Stream(Codec::Bzip2),
    },
    FormatSpec {
        name: "xz",
        extensions: "xz txz",
        add_extensions: "* .tar",
        flags: flags::KEEP_NAME,
        time_flags: 0,
        handler: 0x0C,
        kind: Kind::Stream(Codec::Xz),
    },
    FormatSpec {
        name: "zstd",
        extensions: "zst tzst",
        add_extensions: "* .tar",
        flags: flags::KEEP_NAME,
        time_flags: 0,
        handler: 0x0E,
        kind: Kind::Stream(Codec::Zstd),
    },
];

/// Engine over the bundled format handlers.
///
/// # Examples
///
/// ```
/// use arkive_core::BuiltinEngine;
/// use arkive_core::engine::ArchiveEngine;
/// use arkive_core::engine::FormatProp;
///
/// let engine = BuiltinEngine::new();
/// assert_eq!(engine.format_count(), Ok(7));
/// let name = engine.format_property(0, FormatProp::Name).unwrap();
/// assert_eq!(name.as_str(), Some("7z"));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinEngine;

impl BuiltinEngine {
    /// Creates the engine.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ArchiveEngine for BuiltinEngine {
    fn format_count(&self) -> EngineResult<u32> {
        u32::try_from(FORMATS.len()).map_err(|_| EngineStatus::Unsupported)
    }

    fn format_property(&self, index: u32, prop: FormatProp) -> EngineResult<PropValue> {
        let spec = FORMATS
            .get(index as usize)
            .ok_or(EngineStatus::InvalidParam)?;
        Ok(match prop {
            FormatProp::Name => PropValue::Str(spec.name.to_string()),
            FormatProp::Extension => PropValue::Str(spec.extensions.to_string()),
            FormatProp::AddExtension if spec.add_extensions.is_empty() => PropValue::Empty,
            FormatProp::AddExtension => PropValue::Str(spec.add_extensions.to_string()),
            FormatProp::Flags => PropValue::U32(spec.flags),
            FormatProp::TimeFlags => PropValue::U32(spec.time_flags),
            FormatProp::ClassId => PropValue::Bytes(class_id(spec.handler).to_vec()),
        })
    }

    fn instantiate(&self, id: &FormatId) -> EngineResult<Box<dyn ArchiveHandler>> {
        let spec = FORMATS
            .iter()
            .find(|spec| class_id(spec.handler)[..] == *id.as_bytes())
            .ok_or(EngineStatus::Unsupported)?;
        tracing::trace!(format = spec.name, "instantiating handler");
        Ok(match spec.kind {
            Kind::SevenZ => Box::new(SevenZHandler::new()),
            Kind::Zip => Box::new(ZipHandler::new()),
            Kind::Tar => Box::new(TarHandler::new()),
            Kind::Stream(codec) => Box::new(StreamHandler::new(codec)),
        })
    }
}
