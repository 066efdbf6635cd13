//! CLI argument parsing using clap.

use arkive_core::ExtractionConfig;
use arkive_core::Selection;
use clap::Parser;
use clap::Subcommand;
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "arkive")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output results in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract archive contents
    Extract(ExtractArgs),
    /// Verify archive contents without writing anything
    Test(TestArgs),
    /// List archive contents without extraction
    List(ListArgs),
    /// Show every supported format
    Formats,
    /// Show which format each file resolves to
    Info(InfoArgs),
    /// Generate shell completions
    Completion(CompletionArgs),
}

/// Options shared by passes that open an archive.
#[derive(clap::Args)]
pub struct PassOptions {
    /// Password for encrypted entries
    #[arg(short, long, value_name = "PASSWORD")]
    pub password: Option<String>,

    /// Only process the entry with this index (can be repeated)
    #[arg(short, long = "entry", value_name = "INDEX")]
    pub entries: Vec<u32>,

    /// Maximum leading bytes scanned for a signature
    #[arg(long, value_parser = parse_byte_size, value_name = "BYTES")]
    pub probe_bound: Option<u64>,

    /// Never treat files with this extension as archives (can be repeated)
    #[arg(long = "exclude", short = 'x', value_name = "EXT")]
    pub excluded: Vec<String>,
}

impl PassOptions {
    pub fn selection(&self) -> Selection {
        if self.entries.is_empty() {
            Selection::All
        } else {
            Selection::indices(self.entries.iter().copied())
        }
    }

    pub fn config(&self) -> ExtractionConfig {
        let mut config = ExtractionConfig {
            excluded_extensions: self.excluded.clone(),
            ..Default::default()
        };
        if let Some(bound) = self.probe_bound {
            config.probe_bound = bound;
        }
        config
    }
}

#[derive(clap::Args)]
pub struct ExtractArgs {
    /// Path to the archive file
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,

    /// Output directory (default: current directory)
    #[arg(value_name = "OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    #[command(flatten)]
    pub pass: PassOptions,

    /// Do not restore modification times
    #[arg(long)]
    pub no_mtime: bool,

    /// Strip unsafe path components instead of failing those entries
    #[arg(long)]
    pub trusted: bool,
}

impl ExtractArgs {
    pub fn config(&self) -> ExtractionConfig {
        let mut config = self.pass.config();
        config.preserve_mtime = !self.no_mtime;
        config.reject_unsafe_paths = !self.trusted;
        config
    }
}

#[derive(clap::Args)]
pub struct TestArgs {
    /// Path to the archive file
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,

    #[command(flatten)]
    pub pass: PassOptions,
}

#[derive(clap::Args)]
pub struct ListArgs {
    /// Path to the archive file
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,

    /// Show detailed file information
    #[arg(short, long)]
    pub long: bool,

    /// Show sizes in human-readable format
    #[arg(short = 'H', long)]
    pub human_readable: bool,

    /// Password for archives with encrypted headers
    #[arg(short, long, value_name = "PASSWORD")]
    pub password: Option<String>,
}

#[derive(clap::Args)]
pub struct InfoArgs {
    /// Files to resolve
    #[arg(value_name = "FILE", required = true)]
    pub files: Vec<PathBuf>,
}

#[derive(clap::Args)]
pub struct CompletionArgs {
    /// Target shell
    #[arg(value_enum, value_name = "SHELL")]
    pub shell: Shell,
}

/// Parse byte size with optional suffix (K, M, G, T)
#[allow(clippy::option_if_let_else)]
fn parse_byte_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty byte size".to_string());
    }

    let (num_str, multiplier) = if let Some(stripped) = s.strip_suffix('T') {
        (stripped, 1024_u64.pow(4))
    } else if let Some(stripped) = s.strip_suffix('G') {
        (stripped, 1024_u64.pow(3))
    } else if let Some(stripped) = s.strip_suffix('M') {
        (stripped, 1024_u64.pow(2))
    } else if let Some(stripped) = s.strip_suffix('K') {
        (stripped, 1024)
    } else {
        (s, 1)
    };

    num_str
        .parse::<u64>()
        .map_err(|_| format!("invalid byte size: {s}"))
        .and_then(|n| {
            n.checked_mul(multiplier)
                .ok_or_else(|| format!("byte size overflow: {s}"))
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_byte_size() {
        assert_eq!(parse_byte_size("100").unwrap(), 100);
        assert_eq!(parse_byte_size("1K").unwrap(), 1024);
        assert_eq!(parse_byte_size("8M").unwrap(), 8 * 1024 * 1024);
        assert_eq!(parse_byte_size("1T").unwrap(), 1024_u64.pow(4));
        assert!(parse_byte_size("invalid").is_err());
        assert!(parse_byte_size("").is_err());
        assert!(parse_byte_size("18446744073709551615K").is_err());
    }

    #[test]
    fn test_extract_flags_map_to_config() {
        let cli = Cli::try_parse_from([
            "arkive", "extract", "a.zip", "out", "-p", "pw", "-e", "3", "-e", "1", "--no-mtime",
            "--trusted", "-x", "iso", "--probe-bound", "1M",
        ])
        .unwrap();
        let Commands::Extract(args) = cli.command else {
            panic!("expected extract");
        };
        let config = args.config();
        assert!(!config.preserve_mtime);
        assert!(!config.reject_unsafe_paths);
        assert!(config.is_extension_excluded("ISO"));
        assert_eq!(config.probe_bound, 1024 * 1024);
        assert_eq!(args.pass.password.as_deref(), Some("pw"));
        assert_eq!(args.pass.selection(), Selection::indices([3, 1]));
    }

    #[test]
    fn test_default_selection_is_all() {
        let cli = Cli::try_parse_from(["arkive", "test", "a.7z"]).unwrap();
        let Commands::Test(args) = cli.command else {
            panic!("expected test");
        };
        assert_eq!(args.pass.selection(), Selection::All);
        assert!(args.pass.config().reject_unsafe_paths);
    }
}
