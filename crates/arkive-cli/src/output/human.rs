//! Human-readable output formatter with colors and styling.

use super::formatter::OutputFormatter;
use super::formatter::Resolution;
use crate::progress::humanize_bytes;
use anyhow::Result;
use arkive_core::ExtractMode;
use arkive_core::FormatDescriptor;
use arkive_core::PassResult;
use arkive_core::inspection::ArchiveListing;
use arkive_core::registry::flags;
use arkive_core::timestamp;
use console::Term;
use console::style;
use std::path::Path;

/// Placeholder for entries without a stored path.
const UNNAMED: &str = "(unnamed)";

const FLAG_NAMES: [(u32, &str); 8] = [
    (flags::KEEP_NAME, "keep-name"),
    (flags::ALT_STREAMS, "alt-streams"),
    (flags::NT_SECURE, "nt-secure"),
    (flags::FIND_SIGNATURE, "find-signature"),
    (flags::MULTI_SIGNATURE, "multi-signature"),
    (flags::BACKWARD_OPEN, "backward-open"),
    (flags::SYMLINKS, "symlinks"),
    (flags::HARDLINKS, "hardlinks"),
];

pub struct HumanFormatter {
    verbose: bool,
    quiet: bool,
    use_colors: bool,
    term: Term,
    err: Term,
}

impl HumanFormatter {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            verbose,
            quiet,
            use_colors: console::colors_enabled(),
            term: Term::stdout(),
            err: Term::stderr(),
        }
    }

    fn format_number(n: usize) -> String {
        let s = n.to_string();
        let mut result = String::new();
        let mut count = 0;

        for c in s.chars().rev() {
            if count == 3 {
                result.push(',');
                count = 0;
            }
            result.push(c);
            count += 1;
        }

        result.chars().rev().collect()
    }

    fn flag_names(bits: u32) -> Vec<&'static str> {
        FLAG_NAMES
            .iter()
            .filter(|(flag, _)| bits & flag != 0)
            .map(|(_, name)| *name)
            .collect()
    }

    fn headline(&self, ok: bool, text: &str) {
        let line = match (self.use_colors, ok) {
            (true, true) => format!("{} {text}", style("✓").green().bold()),
            (true, false) => format!("{} {text}", style("✗").red().bold()),
            (false, _) => text.to_string(),
        };
        let _ = self.term.write_line(&line);
    }
}

impl OutputFormatter for HumanFormatter {
    fn format_pass_result(&self, archive: &Path, result: &PassResult) -> Result<()> {
        // Failures go to stderr, even in quiet mode
        for failure in result.failures() {
            let marker = if self.use_colors {
                style("ERROR:").red().bold().to_string()
            } else {
                "ERROR:".to_string()
            };
            let _ = self.err.write_line(&format!(
                "{marker} {}: {}",
                failure.path.display(),
                failure.status
            ));
        }
        if result.needs_password() {
            let _ = self.err.write_line(&format!(
                "HINT: {} entries need a password. Use --password to supply it.",
                result.wrong_password
            ));
        }

        if self.quiet {
            return Ok(());
        }

        let noun = match result.mode {
            ExtractMode::Extract => "Extraction",
            ExtractMode::TestOnly => "Test",
        };
        if result.had_failures() {
            self.headline(false, &format!("{noun} finished with failures: {}", archive.display()));
        } else {
            self.headline(true, &format!("{noun} complete: {}", archive.display()));
        }

        let _ = self.term.write_line(&format!(
            "  Entries:     {}",
            Self::format_number(result.attempted)
        ));
        let _ = self.term.write_line(&format!(
            "  Succeeded:   {} ({} directories)",
            Self::format_number(result.succeeded),
            Self::format_number(result.skipped)
        ));
        let _ = self.term.write_line(&format!(
            "  Failed:      {}",
            Self::format_number(result.failed())
        ));
        let _ = self.term.write_line(&format!(
            "  Total size:  {}",
            humanize_bytes(result.total_bytes)
        ));
        if result.mode == ExtractMode::Extract {
            let _ = self.term.write_line(&format!(
                "  Written:     {}",
                humanize_bytes(result.bytes_written)
            ));
        }

        if self.verbose {
            let _ = self
                .term
                .write_line(&format!("  Duration:    {:?}", result.duration));
            for entry in &result.entries {
                let _ = self.term.write_line(&format!(
                    "    [{}] {}: {}",
                    entry.index,
                    entry.path.display(),
                    entry.status
                ));
            }
        }

        Ok(())
    }

    fn format_listing(
        &self,
        listing: &ArchiveListing,
        long: bool,
        human_readable: bool,
    ) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        if !long {
            for entry in &listing.entries {
                let _ = self
                    .term
                    .write_line(&format!("{}", entry.display_path(UNNAMED).display()));
            }
            return Ok(());
        }

        let size = |bytes: u64| {
            if human_readable {
                humanize_bytes(bytes)
            } else {
                bytes.to_string()
            }
        };

        for entry in &listing.entries {
            let type_char = if entry.is_dir { "d" } else { "-" };
            let lock = if entry.encrypted { "*" } else { " " };
            let packed = entry.packed_size.map_or_else(|| "-".to_string(), size);
            let modified = entry
                .mtime
                .map_or_else(|| "-".to_string(), timestamp::format_utc);

            let _ = self.term.write_line(&format!(
                "{type_char}{lock} {:>10} {:>10}  {modified:<19}  {}",
                size(entry.size),
                packed,
                entry.display_path(UNNAMED).display()
            ));
        }

        let summary = &listing.summary;
        let _ = self.term.write_line("");
        let _ = self.term.write_line(&format!(
            "Total: {} entries ({} directories), {} unpacked, {} packed [{}]",
            Self::format_number(summary.entry_count as usize),
            Self::format_number(summary.directories as usize),
            size(summary.total_size),
            size(summary.total_packed),
            summary.format
        ));
        if summary.any_encrypted {
            let _ = self.term.write_line("Entries marked * are encrypted.");
        }
        if listing.unreadable > 0 {
            let _ = self.err.write_line(&format!(
                "WARNING: {} entries could not be read",
                listing.unreadable
            ));
        }

        Ok(())
    }

    fn format_formats(&self, formats: &[&FormatDescriptor]) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        for descriptor in formats {
            let name = if self.use_colors {
                style(descriptor.name()).bold().to_string()
            } else {
                descriptor.name().to_string()
            };
            let _ = self.term.write_line(&format!(
                "{name:<8} {}",
                descriptor.extension_list()
            ));

            if self.verbose {
                let names = Self::flag_names(descriptor.flags());
                if !names.is_empty() {
                    let _ = self
                        .term
                        .write_line(&format!("         flags: {}", names.join(", ")));
                }
                let add = descriptor.add_extension_list();
                if !add.is_empty() {
                    let _ = self.term.write_line(&format!("         add:   {add}"));
                }
                if !descriptor.can_open() {
                    let _ = self.term.write_line("         (display only)");
                }
            }
        }

        Ok(())
    }

    fn format_resolutions(&self, resolutions: &[Resolution]) -> Result<()> {
        for resolution in resolutions {
            let line = match (&resolution.format, resolution.openable) {
                (Some(format), true) => format!("{}: {format}", resolution.path.display()),
                (Some(format), false) => {
                    format!("{}: {format} (cannot be opened)", resolution.path.display())
                }
                (None, _) => format!("{}: not an archive", resolution.path.display()),
            };
            if resolution.format.is_none() {
                let _ = self.err.write_line(&line);
            } else if !self.quiet {
                let _ = self.term.write_line(&line);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(HumanFormatter::format_number(0), "0");
        assert_eq!(HumanFormatter::format_number(999), "999");
        assert_eq!(HumanFormatter::format_number(1000), "1,000");
        assert_eq!(HumanFormatter::format_number(1_234_567), "1,234,567");
    }

    #[test]
    fn test_flag_names() {
        assert!(HumanFormatter::flag_names(0).is_empty());
        assert_eq!(
            HumanFormatter::flag_names(flags::SYMLINKS | flags::HARDLINKS),
            vec!["symlinks", "hardlinks"]
        );
        assert_eq!(HumanFormatter::flag_names(flags::KEEP_NAME), vec!["keep-name"]);
    }
}
